use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Url;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::{ProviderError, RateProvider};
use crate::domain::{Cents, Currency, decimal_to_cents, format_cents};

pub const FRANKFURTER_BASE_URL: &str = "https://api.frankfurter.app/";

/// Rate provider backed by the public Frankfurter API
/// (`GET /latest?amount=..&from=..&to=..`).
#[derive(Debug, Clone)]
pub struct FrankfurterProvider {
    base_url: Url,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    rates: HashMap<String, Decimal>,
}

impl FrankfurterProvider {
    pub fn new(base_url: &str) -> Result<Self, ProviderError> {
        let base_url =
            Url::parse(base_url).map_err(|err| ProviderError::InvalidUrl(err.to_string()))?;
        Ok(Self {
            base_url,
            http: reqwest::Client::new(),
        })
    }

    /// Share an existing client (connection pool, proxy settings).
    pub fn with_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn latest_url(
        &self,
        amount: Cents,
        from: Currency,
        to: Currency,
    ) -> Result<Url, ProviderError> {
        let mut endpoint = self
            .base_url
            .join("latest")
            .map_err(|err| ProviderError::InvalidUrl(err.to_string()))?;
        endpoint
            .query_pairs_mut()
            .append_pair("amount", &format_cents(amount))
            .append_pair("from", from.as_str())
            .append_pair("to", to.as_str());
        Ok(endpoint)
    }
}

/// Pull the converted amount for `to` out of a `/latest` response body.
fn converted_amount(body: &str, to: Currency) -> Result<Option<Cents>, ProviderError> {
    let response: LatestResponse =
        serde_json::from_str(body).map_err(|err| ProviderError::Decode(err.to_string()))?;
    Ok(response
        .rates
        .get(to.as_str())
        .copied()
        .and_then(decimal_to_cents))
}

#[async_trait]
impl RateProvider for FrankfurterProvider {
    async fn lookup(
        &self,
        amount: Cents,
        from: Currency,
        to: Currency,
    ) -> Result<Option<Cents>, ProviderError> {
        let endpoint = self.latest_url(amount, from, to)?;
        tracing::debug!(%endpoint, "requesting exchange rate");

        let res = self.http.get(endpoint).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body = res.text().await?;
        converted_amount(&body, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_url() {
        let provider = FrankfurterProvider::new(FRANKFURTER_BASE_URL).unwrap();
        let url = provider
            .latest_url(10_000, Currency::Eur, Currency::Usd)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.frankfurter.app/latest?amount=100.00&from=EUR&to=USD"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            FrankfurterProvider::new("not a url"),
            Err(ProviderError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_parse_converted_amount() {
        let body = r#"{"amount":100.0,"base":"EUR","date":"2024-05-31","rates":{"USD":108.0}}"#;
        assert_eq!(converted_amount(body, Currency::Usd).unwrap(), Some(10_800));
    }

    #[test]
    fn test_missing_rate_is_none() {
        let body = r#"{"amount":100.0,"base":"EUR","date":"2024-05-31","rates":{"GBP":85.2}}"#;
        assert_eq!(converted_amount(body, Currency::Usd).unwrap(), None);
    }

    #[test]
    fn test_malformed_body_is_decode_error() {
        assert!(matches!(
            converted_amount("<html>busy</html>", Currency::Usd),
            Err(ProviderError::Decode(_))
        ));
    }
}
