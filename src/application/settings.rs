//! Session settings, layered as: built-in defaults, then an optional TOML
//! file, then `FINSERV_*` environment variables. The CLI applies its own
//! flags on top.

use std::time::Duration;

use config::{Config, Environment, File, Map};
use serde::{Deserialize, Serialize};

use super::AppError;
use crate::conversion::{ConversionPolicy, FRANKFURTER_BASE_URL};
use crate::domain::{
    Cents, DEFAULT_ACCOUNT_NUMBER, DEFAULT_CHECKING_CENTS, DEFAULT_SAVINGS_CENTS, Profile,
    format_cents, parse_cents,
};
use crate::io::{DEFAULT_VENDORS, Vendor};

pub const DEFAULT_CONFIG_PATH: &str = "finserv.toml";
pub const ENV_PREFIX: &str = "FINSERV";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub account_number: String,
    pub holder_name: String,
    pub holder_email: String,
    /// Opening balances, as decimal strings ("2000.00").
    pub checking_balance: String,
    pub savings_balance: String,
    pub rate_provider_url: String,
    pub conversion_timeout_ms: u64,
    pub conversion_policy: ConversionPolicy,
    /// Use the built-in rate table instead of the network.
    pub offline: bool,
    pub vendors: Vec<Vendor>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            account_number: DEFAULT_ACCOUNT_NUMBER.to_string(),
            holder_name: String::new(),
            holder_email: String::new(),
            checking_balance: format_cents(DEFAULT_CHECKING_CENTS),
            savings_balance: format_cents(DEFAULT_SAVINGS_CENTS),
            rate_provider_url: FRANKFURTER_BASE_URL.to_string(),
            conversion_timeout_ms: 5_000,
            conversion_policy: ConversionPolicy::BestEffort,
            offline: false,
            vendors: DEFAULT_VENDORS.into_iter().map(Vendor::new).collect(),
        }
    }
}

impl AppConfig {
    /// Load settings from `path` (or the default path, if present) and the
    /// process environment.
    pub fn load(path: Option<&str>) -> Result<Self, AppError> {
        Self::load_with_env(path, None)
    }

    /// Like [`AppConfig::load`], reading environment variables from `env`
    /// instead of the process when given.
    pub fn load_with_env(
        path: Option<&str>,
        env: Option<Map<String, String>>,
    ) -> Result<Self, AppError> {
        // An explicitly requested file must exist; the default one is optional.
        let file = match path {
            Some(path) => File::with_name(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_PATH).required(false),
        };

        let settings: AppConfig = Config::builder()
            .add_source(file)
            // Values stay strings here; serde converts numeric and bool fields,
            // so account numbers and balances keep their exact text.
            .add_source(Environment::with_prefix(ENV_PREFIX).source(env))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.opening_balances()?;
        if self.conversion_timeout_ms == 0 {
            return Err(AppError::Config(
                "conversion_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Opening (checking, savings) balances in cents.
    pub fn opening_balances(&self) -> Result<(Cents, Cents), AppError> {
        let parse = |field: &str, value: &str| -> Result<Cents, AppError> {
            let cents = parse_cents(value)
                .map_err(|err| AppError::Config(format!("{}: {}", field, err)))?;
            if cents < 0 {
                return Err(AppError::Config(format!("{} must not be negative", field)));
            }
            Ok(cents)
        };

        Ok((
            parse("checking_balance", &self.checking_balance)?,
            parse("savings_balance", &self.savings_balance)?,
        ))
    }

    pub fn conversion_timeout(&self) -> Duration {
        Duration::from_millis(self.conversion_timeout_ms)
    }

    pub fn profile(&self) -> Profile {
        Profile::new(
            self.holder_name.clone(),
            self.holder_email.clone(),
            self.account_number.clone(),
        )
    }
}
