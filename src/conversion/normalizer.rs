use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::RateProvider;
use crate::domain::{AccountKind, Cents, Currency, cents_to_f64};
use crate::observability::{NoopSink, ObservabilitySink};

pub const CONVERSION_SPAN: &str = "currency_conversion";
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// What a caller does with a conversion that fell back to the source amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionPolicy {
    /// Proceed with the unconverted amount.
    #[default]
    BestEffort,
    /// Refuse to move money on an unconverted amount.
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionRequest {
    pub amount: Cents,
    pub currency: Currency,
    /// Account the converted amount will be paid from, recorded on the span.
    pub account: Option<AccountKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub source_amount: Cents,
    pub source_currency: Currency,
    pub usd_amount: Cents,
    /// True when the provider could not be used and `usd_amount` is the
    /// source amount passed through unchanged.
    pub fallback_used: bool,
}

impl ConversionResult {
    pub fn converted(&self) -> bool {
        !self.fallback_used
    }
}

/// Converts amounts into USD, best effort.
pub struct CurrencyNormalizer {
    provider: Arc<dyn RateProvider>,
    sink: Arc<dyn ObservabilitySink>,
    timeout: Duration,
}

impl CurrencyNormalizer {
    pub fn new(provider: Arc<dyn RateProvider>) -> Self {
        Self {
            provider,
            sink: Arc::new(NoopSink),
            timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ObservabilitySink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Convert `amount` of `currency` into USD.
    ///
    /// Never fails: a missing rate, provider error or timeout yields the
    /// source amount with `fallback_used` set. One lookup per call, no retries.
    pub async fn to_usd(&self, amount: Cents, currency: Currency) -> ConversionResult {
        self.normalize(ConversionRequest {
            amount,
            currency,
            account: None,
        })
        .await
    }

    pub async fn normalize(&self, request: ConversionRequest) -> ConversionResult {
        let ConversionRequest {
            amount,
            currency,
            account,
        } = request;

        let mut span = self.sink.start_span(CONVERSION_SPAN);
        span.set_attribute("currency", currency.as_str());
        span.set_attribute("amount", cents_to_f64(amount));
        if let Some(account) = account {
            span.set_attribute("account", account.as_str());
        }

        if currency == Currency::HOME {
            span.set_attribute("fallback_used", false);
            span.end();
            return ConversionResult {
                source_amount: amount,
                source_currency: currency,
                usd_amount: amount,
                fallback_used: false,
            };
        }

        let lookup = self.provider.lookup(amount, currency, Currency::HOME);
        let converted = match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(Some(usd))) => Some(usd),
            Ok(Ok(None)) => {
                tracing::warn!(%currency, "no USD rate available, using source amount");
                None
            }
            Ok(Err(err)) => {
                tracing::warn!(%currency, error = %err, "rate lookup failed, using source amount");
                None
            }
            Err(_) => {
                tracing::warn!(
                    %currency,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "rate lookup timed out, using source amount"
                );
                None
            }
        };

        let result = ConversionResult {
            source_amount: amount,
            source_currency: currency,
            usd_amount: converted.unwrap_or(amount),
            fallback_used: converted.is_none(),
        };

        span.set_attribute("fallback_used", result.fallback_used);
        span.set_attribute("usd_amount", cents_to_f64(result.usd_amount));
        span.end();
        result
    }
}

impl std::fmt::Debug for CurrencyNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrencyNormalizer")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
