use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Currencies a payment may be entered in. Balances are always USD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Cad,
}

impl Currency {
    pub const SUPPORTED: [Currency; 3] = [Currency::Usd, Currency::Eur, Currency::Cad];

    /// The ledger's home currency.
    pub const HOME: Currency = Currency::Usd;

    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Cad => "CAD",
        }
    }

    pub fn parse(code: &str) -> Result<Self, UnsupportedCurrency> {
        match code.trim().to_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "CAD" => Ok(Currency::Cad),
            _ => Err(UnsupportedCurrency(code.to_string())),
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported currency '{0}' (supported: USD, EUR, CAD)")]
pub struct UnsupportedCurrency(pub String);
