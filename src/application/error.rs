use thiserror::Error;

use crate::domain::{Cents, Currency, InvalidProfile, LedgerError, format_cents};

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Unknown vendor: {0}")]
    UnknownVendor(String),

    #[error(
        "Could not convert {} {currency} to USD; payment not sent",
        format_cents(*.amount)
    )]
    ConversionUnavailable { currency: Currency, amount: Cents },

    #[error(transparent)]
    Profile(#[from] InvalidProfile),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}
