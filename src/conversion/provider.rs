use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::{Cents, Currency, cents_to_decimal, decimal_to_cents};

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("rate provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate provider returned HTTP {0}")]
    Status(u16),

    #[error("invalid rate provider response: {0}")]
    Decode(String),

    #[error("invalid rate provider URL: {0}")]
    InvalidUrl(String),

    #[error("rate provider unavailable")]
    Unavailable,
}

/// External exchange-rate lookup.
///
/// `Ok(None)` means the provider answered but had no rate for the pair.
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn lookup(
        &self,
        amount: Cents,
        from: Currency,
        to: Currency,
    ) -> Result<Option<Cents>, ProviderError>;
}

/// Provider backed by a fixed table of rates into USD.
#[derive(Debug, Clone, Default)]
pub struct StaticRateProvider {
    rates: HashMap<Currency, Decimal>,
}

impl StaticRateProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reference rates used when running offline.
    pub fn default_rates() -> Self {
        Self::new()
            .with_rate(Currency::Eur, Decimal::new(108, 2))
            .with_rate(Currency::Cad, Decimal::new(73, 2))
    }

    /// Set the USD value of one unit of `currency`.
    pub fn with_rate(mut self, currency: Currency, usd_per_unit: Decimal) -> Self {
        self.rates.insert(currency, usd_per_unit);
        self
    }
}

#[async_trait]
impl RateProvider for StaticRateProvider {
    async fn lookup(
        &self,
        amount: Cents,
        from: Currency,
        to: Currency,
    ) -> Result<Option<Cents>, ProviderError> {
        if from == to {
            return Ok(Some(amount));
        }
        if to != Currency::HOME {
            return Ok(None);
        }

        Ok(self
            .rates
            .get(&from)
            .and_then(|rate| cents_to_decimal(amount).checked_mul(*rate))
            .and_then(decimal_to_cents))
    }
}

/// Provider that always fails; exercises the fallback path.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableProvider;

#[async_trait]
impl RateProvider for UnavailableProvider {
    async fn lookup(
        &self,
        _amount: Cents,
        _from: Currency,
        _to: Currency,
    ) -> Result<Option<Cents>, ProviderError> {
        Err(ProviderError::Unavailable)
    }
}
