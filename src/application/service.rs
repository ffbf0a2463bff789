use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversion::{
    ConversionPolicy, ConversionRequest, ConversionResult, CurrencyNormalizer,
    FrankfurterProvider, RateProvider, StaticRateProvider,
};
use crate::domain::{
    AccountKind, AccountLedger, BalanceSnapshot, Cents, Currency, LedgerError, Profile,
};
use crate::io::{
    HttpVendorNotifier, NoopNotifier, VendorDirectory, VendorNotification, VendorNotifier,
};
use crate::observability::ObservabilitySink;

use super::{AppConfig, AppError};

/// Application service providing the session's money-movement use cases.
/// This is the primary interface for any client (CLI, tests, a UI shell).
///
/// The ledger sits behind a mutex that is only held for the synchronous
/// ledger call; currency conversion runs before the lock is taken.
pub struct PaymentService {
    ledger: Mutex<AccountLedger>,
    normalizer: CurrencyNormalizer,
    notifier: Arc<dyn VendorNotifier>,
    vendors: VendorDirectory,
    policy: ConversionPolicy,
    profile: Mutex<Profile>,
}

/// Result of a transfer between the two accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResult {
    pub from: AccountKind,
    pub to: AccountKind,
    pub amount: Cents,
    pub balances: BalanceSnapshot,
}

/// A payment as entered by the user
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub vendor: String,
    /// Defaults to the vendor name when omitted.
    pub recipient: Option<String>,
    pub account: String,
    /// Amount in `currency`.
    pub amount: Cents,
    pub currency: Currency,
}

/// Result of a completed payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResult {
    pub id: Uuid,
    pub vendor: String,
    pub recipient: String,
    pub account: AccountKind,
    pub conversion: ConversionResult,
    pub balances: BalanceSnapshot,
}

impl PaymentService {
    /// Create a service around an existing ledger and normalizer. Vendors
    /// default to the built-in directory and notifications are discarded.
    pub fn new(ledger: AccountLedger, normalizer: CurrencyNormalizer) -> Self {
        let profile = Profile::new("", "", ledger.account_number());
        Self {
            ledger: Mutex::new(ledger),
            normalizer,
            notifier: Arc::new(NoopNotifier),
            vendors: VendorDirectory::with_defaults(),
            policy: ConversionPolicy::default(),
            profile: Mutex::new(profile),
        }
    }

    /// Build a service from settings, with HTTP rate lookups (or the static
    /// table when `offline`) and HTTP vendor notifications.
    pub fn from_config(
        config: &AppConfig,
        sink: Arc<dyn ObservabilitySink>,
    ) -> Result<Self, AppError> {
        config.validate()?;
        let (checking, savings) = config.opening_balances()?;
        let ledger = AccountLedger::new(
            config.account_number.clone(),
            checking,
            savings,
            Arc::clone(&sink),
        )?;

        let provider: Arc<dyn RateProvider> = if config.offline {
            Arc::new(StaticRateProvider::default_rates())
        } else {
            Arc::new(
                FrankfurterProvider::new(&config.rate_provider_url)
                    .map_err(|err| AppError::Config(err.to_string()))?,
            )
        };

        let normalizer = CurrencyNormalizer::new(provider)
            .with_sink(sink)
            .with_timeout(config.conversion_timeout());

        Ok(Self::new(ledger, normalizer)
            .with_notifier(Arc::new(HttpVendorNotifier::new()))
            .with_vendors(VendorDirectory::new(config.vendors.clone()))
            .with_policy(config.conversion_policy)
            .with_profile_unchecked(config.profile()))
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn VendorNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_vendors(mut self, vendors: VendorDirectory) -> Self {
        self.vendors = vendors;
        self
    }

    pub fn with_policy(mut self, policy: ConversionPolicy) -> Self {
        self.policy = policy;
        self
    }

    // Settings may carry an incomplete profile; it is only validated when
    // the holder edits it.
    fn with_profile_unchecked(self, profile: Profile) -> Self {
        *lock(&self.profile) = profile;
        self
    }

    pub fn policy(&self) -> ConversionPolicy {
        self.policy
    }

    pub fn vendors(&self) -> &VendorDirectory {
        &self.vendors
    }

    /// Register a callback run after every successful balance change.
    pub fn subscribe(&self, listener: impl Fn(&BalanceSnapshot) + Send + Sync + 'static) {
        lock(&self.ledger).subscribe(listener);
    }

    // ========================
    // Balances
    // ========================

    pub fn balances(&self) -> BalanceSnapshot {
        lock(&self.ledger).snapshot()
    }

    // ========================
    // Transfer operations
    // ========================

    /// Move money between checking and savings.
    pub fn transfer(
        &self,
        from: &str,
        to: &str,
        amount: Cents,
    ) -> Result<TransferResult, AppError> {
        let mut ledger = lock(&self.ledger);
        let (from, to) = ledger.transfer_named(from, to, amount)?;
        let balances = ledger.snapshot();
        drop(ledger);

        tracing::info!(%from, %to, amount, "transfer completed");
        Ok(TransferResult {
            from,
            to,
            amount,
            balances,
        })
    }

    // ========================
    // Payment operations
    // ========================

    /// Preview what `amount` of `currency` is worth in USD.
    pub async fn convert(&self, amount: Cents, currency: Currency) -> ConversionResult {
        self.normalizer.to_usd(amount, currency).await
    }

    /// Pay a vendor: convert to USD, debit the account, notify the vendor.
    /// The account is resolved before any rate lookup.
    pub async fn pay(&self, request: PaymentRequest) -> Result<PaymentResult, AppError> {
        if request.amount <= 0 {
            return Err(LedgerError::InvalidAmount(request.amount).into());
        }

        let vendor = self
            .vendors
            .find(&request.vendor)
            .ok_or_else(|| AppError::UnknownVendor(request.vendor.clone()))?;

        let account = AccountKind::parse(&request.account)?;

        let conversion = self
            .normalizer
            .normalize(ConversionRequest {
                amount: request.amount,
                currency: request.currency,
                account: Some(account),
            })
            .await;
        if conversion.fallback_used && self.policy == ConversionPolicy::Strict {
            return Err(AppError::ConversionUnavailable {
                currency: request.currency,
                amount: request.amount,
            });
        }

        let balances = {
            let mut ledger = lock(&self.ledger);
            ledger.debit(account, conversion.usd_amount)?;
            ledger.snapshot()
        };

        let recipient = request
            .recipient
            .filter(|recipient| !recipient.trim().is_empty())
            .unwrap_or_else(|| vendor.name.clone());

        self.notifier.notify(
            vendor,
            VendorNotification::new(vendor, &recipient, request.amount, request.currency),
        );

        tracing::info!(
            vendor = %vendor.name,
            %account,
            usd_amount = conversion.usd_amount,
            fallback_used = conversion.fallback_used,
            "payment completed"
        );

        Ok(PaymentResult {
            id: Uuid::new_v4(),
            vendor: vendor.name.clone(),
            recipient,
            account,
            conversion,
            balances,
        })
    }

    /// Wait up to `timeout` for vendor notifications still being delivered.
    /// Returns how many were abandoned.
    pub async fn flush_notifications(&self, timeout: Duration) -> usize {
        self.notifier.flush(timeout).await
    }

    // ========================
    // Profile operations
    // ========================

    pub fn profile(&self) -> Profile {
        lock(&self.profile).clone()
    }

    /// Replace the holder profile. The ledger's account number follows it.
    pub fn update_profile(&self, profile: Profile) -> Result<Profile, AppError> {
        profile.validate()?;
        lock(&self.ledger).set_account_number(profile.account_number.clone());
        *lock(&self.profile) = profile.clone();
        Ok(profile)
    }
}

// A panic elsewhere cannot leave the ledger half-updated: each operation
// computes new balances before writing them. Recover the guard instead of
// propagating the poison.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
