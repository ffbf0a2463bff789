use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The account holder shown alongside the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub email: String,
    pub account_number: String,
}

impl Profile {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        account_number: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            account_number: account_number.into(),
        }
    }

    /// All three fields must be non-blank.
    pub fn validate(&self) -> Result<(), InvalidProfile> {
        let missing: Vec<&'static str> = [
            ("name", &self.name),
            ("email", &self.email),
            ("account_number", &self.account_number),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(InvalidProfile { missing })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid profile information: missing {}", .missing.join(", "))]
pub struct InvalidProfile {
    pub missing: Vec<&'static str>,
}
