use serde::{Deserialize, Serialize};

use super::LedgerError;

/// The two accounts a session ledger holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Checking,
    Savings,
}

impl AccountKind {
    pub const ALL: [AccountKind; 2] = [AccountKind::Checking, AccountKind::Savings];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Checking => "checking",
            AccountKind::Savings => "savings",
        }
    }

    /// Parse an account name, ignoring case and surrounding whitespace.
    pub fn parse(name: &str) -> Result<Self, LedgerError> {
        match name.trim().to_lowercase().as_str() {
            "checking" => Ok(AccountKind::Checking),
            "savings" => Ok(AccountKind::Savings),
            _ => Err(LedgerError::InvalidAccountSelection(name.to_string())),
        }
    }

    /// The other account of the pair.
    pub fn counterpart(&self) -> Self {
        match self {
            AccountKind::Checking => AccountKind::Savings,
            AccountKind::Savings => AccountKind::Checking,
        }
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(AccountKind::parse("Checking"), Ok(AccountKind::Checking));
        assert_eq!(AccountKind::parse("SAVINGS"), Ok(AccountKind::Savings));
        assert_eq!(AccountKind::parse(" savings "), Ok(AccountKind::Savings));
    }

    #[test]
    fn test_parse_rejects_unknown_names() {
        assert!(matches!(
            AccountKind::parse("brokerage"),
            Err(LedgerError::InvalidAccountSelection(name)) if name == "brokerage"
        ));
        assert!(AccountKind::parse("").is_err());
    }

    #[test]
    fn test_account_kind_roundtrip() {
        for kind in AccountKind::ALL {
            assert_eq!(AccountKind::parse(kind.as_str()), Ok(kind));
            assert_ne!(kind.counterpart(), kind);
        }
    }
}
