use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::domain::{Cents, Currency, cents_to_f64};

/// Payee a payment can be sent to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vendor {
    pub name: String,
    /// Where payment notifications are POSTed. `None` disables notification.
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl Vendor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

pub const DEFAULT_VENDORS: [&str; 6] = [
    "Acme Utilities",
    "TechCorp Internet",
    "Metro Mobile",
    "NextGen Cable",
    "EcoPower Grid",
    "SwiftClean Services",
];

/// The set of vendors a session can pay.
#[derive(Debug, Clone, Default)]
pub struct VendorDirectory {
    vendors: Vec<Vendor>,
}

impl VendorDirectory {
    pub fn new(vendors: Vec<Vendor>) -> Self {
        Self { vendors }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_VENDORS.into_iter().map(Vendor::new).collect())
    }

    /// Look up a vendor by name, ignoring case.
    pub fn find(&self, name: &str) -> Option<&Vendor> {
        let name = name.trim();
        self.vendors
            .iter()
            .find(|vendor| vendor.name.eq_ignore_ascii_case(name))
    }

    pub fn list(&self) -> &[Vendor] {
        &self.vendors
    }

    pub fn is_empty(&self) -> bool {
        self.vendors.is_empty()
    }
}

/// Body POSTed to a vendor after a successful payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorNotification {
    pub vendor: String,
    pub recipient: String,
    /// Amount in the currency the payment was entered in.
    pub amount: f64,
    pub currency: Currency,
}

impl VendorNotification {
    pub fn new(vendor: &Vendor, recipient: &str, amount: Cents, currency: Currency) -> Self {
        Self {
            vendor: vendor.name.clone(),
            recipient: recipient.to_string(),
            amount: cents_to_f64(amount),
            currency,
        }
    }
}

/// Fire-and-forget delivery of payment notifications.
///
/// `notify` returns immediately; the outcome never affects the payment that
/// triggered it. `flush` lets a short-lived process wait for deliveries
/// still in flight before its runtime shuts down.
#[async_trait]
pub trait VendorNotifier: Send + Sync {
    fn notify(&self, vendor: &Vendor, notification: VendorNotification);

    /// Wait up to `timeout` for pending deliveries. Returns how many were
    /// abandoned.
    async fn flush(&self, _timeout: Duration) -> usize {
        0
    }
}

/// Notifier that POSTs JSON to the vendor endpoint on a background task.
#[derive(Debug, Clone, Default)]
pub struct HttpVendorNotifier {
    http: reqwest::Client,
    pending: Arc<Mutex<JoinSet<()>>>,
}

impl HttpVendorNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self {
            http,
            pending: Arc::default(),
        }
    }

    /// Deliveries spawned and not yet reaped by `flush`.
    pub fn pending(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl VendorNotifier for HttpVendorNotifier {
    fn notify(&self, vendor: &Vendor, notification: VendorNotification) {
        let Some(endpoint) = vendor.endpoint.clone() else {
            tracing::debug!(vendor = %vendor.name, "vendor has no endpoint, skipping notification");
            return;
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(vendor = %vendor.name, "no async runtime, vendor notification dropped");
            return;
        };

        let http = self.http.clone();
        let vendor_name = vendor.name.clone();
        let delivery = async move {
            match http.post(&endpoint).json(&notification).send().await {
                Ok(res) if res.status().is_success() => {
                    tracing::info!(vendor = %vendor_name, "payment sent to vendor");
                }
                Ok(res) => {
                    tracing::warn!(
                        vendor = %vendor_name,
                        status = res.status().as_u16(),
                        "vendor rejected payment notification"
                    );
                }
                Err(err) => {
                    tracing::warn!(vendor = %vendor_name, error = %err, "vendor POST failed");
                }
            }
        };

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        // Reap finished deliveries so a long session does not accumulate them.
        while pending.try_join_next().is_some() {}
        pending.spawn_on(delivery, &runtime);
    }

    async fn flush(&self, timeout: Duration) -> usize {
        let mut pending =
            std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner));

        let drained = tokio::time::timeout(timeout, async {
            while pending.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                abandoned = pending.len(),
                "vendor notifications still pending at shutdown"
            );
        }
        // Dropping the set aborts whatever is left.
        pending.len()
    }
}

/// Notifier that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl VendorNotifier for NoopNotifier {
    fn notify(&self, _vendor: &Vendor, _notification: VendorNotification) {}
}
