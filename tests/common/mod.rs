// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use finserv_ledger::PaymentService;
use finserv_ledger::conversion::{
    CurrencyNormalizer, ProviderError, RateProvider, StaticRateProvider, UnavailableProvider,
};
use finserv_ledger::domain::{AccountLedger, Cents, Currency};
use finserv_ledger::io::{Vendor, VendorNotification, VendorNotifier};
use finserv_ledger::observability::RecordingSink;
use rust_decimal_macros::dec;

/// Provider wrapper that counts how often it is asked for a rate.
pub struct CountingProvider<P> {
    inner: P,
    calls: Arc<AtomicUsize>,
}

impl<P> CountingProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl<P: RateProvider> RateProvider for CountingProvider<P> {
    async fn lookup(
        &self,
        amount: Cents,
        from: Currency,
        to: Currency,
    ) -> Result<Option<Cents>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.lookup(amount, from, to).await
    }
}

/// Provider that answers correctly, but only after `delay`.
pub struct SlowProvider {
    pub delay: Duration,
}

#[async_trait]
impl RateProvider for SlowProvider {
    async fn lookup(
        &self,
        amount: Cents,
        _from: Currency,
        _to: Currency,
    ) -> Result<Option<Cents>, ProviderError> {
        tokio::time::sleep(self.delay).await;
        Ok(Some(amount * 2))
    }
}

/// Notifier that keeps every notification it is handed.
#[derive(Clone, Default)]
pub struct CapturingNotifier {
    sent: Arc<Mutex<Vec<VendorNotification>>>,
}

impl CapturingNotifier {
    pub fn sent(&self) -> Vec<VendorNotification> {
        self.sent.lock().unwrap().clone()
    }
}

impl VendorNotifier for CapturingNotifier {
    fn notify(&self, _vendor: &Vendor, notification: VendorNotification) {
        self.sent.lock().unwrap().push(notification);
    }
}

/// Rates used throughout the tests: 1 EUR = 1.08 USD, 1 CAD = 0.73 USD.
pub fn test_rates() -> StaticRateProvider {
    StaticRateProvider::new()
        .with_rate(Currency::Eur, dec!(1.08))
        .with_rate(Currency::Cad, dec!(0.73))
}

/// A wired-up service plus handles on its sink and notifier.
pub struct TestHarness {
    pub service: PaymentService,
    pub sink: RecordingSink,
    pub notifier: CapturingNotifier,
}

/// Helper to create a service with the default session balances
/// (checking 2000.00, savings 5000.00) on top of `provider`.
pub fn harness_with(provider: Arc<dyn RateProvider>) -> TestHarness {
    let sink = RecordingSink::new();
    let notifier = CapturingNotifier::default();

    let ledger = AccountLedger::with_defaults().with_sink(Arc::new(sink.clone()));
    let normalizer = CurrencyNormalizer::new(provider)
        .with_sink(Arc::new(sink.clone()))
        .with_timeout(Duration::from_millis(200));
    let service =
        PaymentService::new(ledger, normalizer).with_notifier(Arc::new(notifier.clone()));

    TestHarness {
        service,
        sink,
        notifier,
    }
}

pub fn harness() -> TestHarness {
    harness_with(Arc::new(test_rates()))
}

pub fn offline_harness() -> TestHarness {
    harness_with(Arc::new(UnavailableProvider))
}
