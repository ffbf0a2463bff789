use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{AccountKind, Cents, cents_to_f64, format_cents};
use crate::observability::{NoopSink, ObservabilitySink, Span};

pub const TRANSFER_SPAN: &str = "transfer";
pub const PAYMENT_SPAN: &str = "payment";

/// Account number used when a session does not supply one.
pub const DEFAULT_ACCOUNT_NUMBER: &str = "ABCDE";
pub const DEFAULT_CHECKING_CENTS: Cents = 200_000;
pub const DEFAULT_SAVINGS_CENTS: Cents = 500_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Invalid amount: {}", format_cents(*.0))]
    InvalidAmount(Cents),

    #[error("Invalid account selection: {0}")]
    InvalidAccountSelection(String),

    #[error(
        "Insufficient balance in {account}: balance {}, required {}",
        format_cents(*.balance),
        format_cents(*.required)
    )]
    InsufficientFunds {
        account: AccountKind,
        balance: Cents,
        required: Cents,
    },
}

/// Point-in-time view of both balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub account_number: String,
    pub checking: Cents,
    pub savings: Cents,
    pub taken_at: DateTime<Utc>,
}

impl BalanceSnapshot {
    pub fn balance(&self, account: AccountKind) -> Cents {
        match account {
            AccountKind::Checking => self.checking,
            AccountKind::Savings => self.savings,
        }
    }

    /// Combined balance. Widened so two near-maximal balances cannot overflow.
    pub fn total(&self) -> i128 {
        i128::from(self.checking) + i128::from(self.savings)
    }
}

pub type BalanceListener = Box<dyn Fn(&BalanceSnapshot) + Send + Sync>;

/// In-memory ledger for one session: a checking and a savings balance.
///
/// Balances never go negative. Every rejected operation leaves both balances
/// exactly as they were. Callers sharing a ledger across tasks must serialize
/// access themselves (see `application::PaymentService`).
pub struct AccountLedger {
    account_number: String,
    checking: Cents,
    savings: Cents,
    sink: Arc<dyn ObservabilitySink>,
    listeners: Vec<BalanceListener>,
}

impl AccountLedger {
    /// Create a ledger with the given opening balances.
    pub fn new(
        account_number: impl Into<String>,
        checking: Cents,
        savings: Cents,
        sink: Arc<dyn ObservabilitySink>,
    ) -> Result<Self, LedgerError> {
        if checking < 0 {
            return Err(LedgerError::InvalidAmount(checking));
        }
        if savings < 0 {
            return Err(LedgerError::InvalidAmount(savings));
        }

        Ok(Self {
            account_number: account_number.into(),
            checking,
            savings,
            sink,
            listeners: Vec::new(),
        })
    }

    /// Ledger seeded with the default session balances and no tracing.
    pub fn with_defaults() -> Self {
        Self {
            account_number: DEFAULT_ACCOUNT_NUMBER.to_string(),
            checking: DEFAULT_CHECKING_CENTS,
            savings: DEFAULT_SAVINGS_CENTS,
            sink: Arc::new(NoopSink),
            listeners: Vec::new(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ObservabilitySink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn account_number(&self) -> &str {
        &self.account_number
    }

    pub fn set_account_number(&mut self, account_number: impl Into<String>) {
        self.account_number = account_number.into();
    }

    pub fn checking(&self) -> Cents {
        self.checking
    }

    pub fn savings(&self) -> Cents {
        self.savings
    }

    pub fn balance(&self, account: AccountKind) -> Cents {
        match account {
            AccountKind::Checking => self.checking,
            AccountKind::Savings => self.savings,
        }
    }

    pub fn total(&self) -> i128 {
        i128::from(self.checking) + i128::from(self.savings)
    }

    pub fn snapshot(&self) -> BalanceSnapshot {
        BalanceSnapshot {
            account_number: self.account_number.clone(),
            checking: self.checking,
            savings: self.savings,
            taken_at: Utc::now(),
        }
    }

    /// Register a callback run after every successful balance change.
    pub fn subscribe(&mut self, listener: impl Fn(&BalanceSnapshot) + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    // ========================
    // Transfers
    // ========================

    /// Move `amount` from one account to the other.
    pub fn transfer(
        &mut self,
        from: AccountKind,
        to: AccountKind,
        amount: Cents,
    ) -> Result<(), LedgerError> {
        let mut span = self.open_span(TRANSFER_SPAN, amount);
        span.set_attribute("from", from.as_str());
        span.set_attribute("to", to.as_str());

        let result = self.apply_transfer(from, to, amount);
        close_span(span, &result);
        result
    }

    /// Like [`AccountLedger::transfer`], resolving account names first.
    /// Returns the resolved accounts.
    pub fn transfer_named(
        &mut self,
        from: &str,
        to: &str,
        amount: Cents,
    ) -> Result<(AccountKind, AccountKind), LedgerError> {
        let mut span = self.open_span(TRANSFER_SPAN, amount);
        span.set_attribute("from", from);
        span.set_attribute("to", to);

        let result = ensure_positive(amount)
            .and_then(|_| Ok((AccountKind::parse(from)?, AccountKind::parse(to)?)))
            .and_then(|(from, to)| self.apply_transfer(from, to, amount).map(|_| (from, to)));
        close_span(span, &result);
        result
    }

    fn apply_transfer(
        &mut self,
        from: AccountKind,
        to: AccountKind,
        amount: Cents,
    ) -> Result<(), LedgerError> {
        ensure_positive(amount)?;
        if from == to {
            return Err(LedgerError::InvalidAccountSelection(format!(
                "{} -> {}",
                from, to
            )));
        }

        let available = self.balance(from);
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                account: from,
                balance: available,
                required: amount,
            });
        }

        // Both sides are computed before either is written.
        let debited = available - amount;
        let credited = self
            .balance(to)
            .checked_add(amount)
            .ok_or(LedgerError::InvalidAmount(amount))?;

        *self.slot(from) = debited;
        *self.slot(to) = credited;

        self.notify();
        Ok(())
    }

    // ========================
    // Payments
    // ========================

    /// Take `amount` out of `account`.
    pub fn debit(&mut self, account: AccountKind, amount: Cents) -> Result<(), LedgerError> {
        let mut span = self.open_span(PAYMENT_SPAN, amount);
        span.set_attribute("account", account.as_str());

        let result = self.apply_debit(account, amount);
        close_span(span, &result);
        result
    }

    /// Like [`AccountLedger::debit`], resolving the account name first.
    /// Returns the resolved account.
    pub fn debit_named(
        &mut self,
        account: &str,
        amount: Cents,
    ) -> Result<AccountKind, LedgerError> {
        let mut span = self.open_span(PAYMENT_SPAN, amount);
        span.set_attribute("account", account);

        let result = ensure_positive(amount)
            .and_then(|_| AccountKind::parse(account))
            .and_then(|kind| self.apply_debit(kind, amount).map(|_| kind));
        close_span(span, &result);
        result
    }

    fn apply_debit(&mut self, account: AccountKind, amount: Cents) -> Result<(), LedgerError> {
        ensure_positive(amount)?;

        let available = self.balance(account);
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                account,
                balance: available,
                required: amount,
            });
        }

        *self.slot(account) = available - amount;

        self.notify();
        Ok(())
    }

    // ========================
    // Helpers
    // ========================

    fn slot(&mut self, account: AccountKind) -> &mut Cents {
        match account {
            AccountKind::Checking => &mut self.checking,
            AccountKind::Savings => &mut self.savings,
        }
    }

    fn open_span(&self, name: &str, amount: Cents) -> Span {
        let mut span = self.sink.start_span(name);
        span.set_attribute("account_number", self.account_number.as_str());
        span.set_attribute("amount", cents_to_f64(amount));
        span
    }

    fn notify(&self) {
        if self.listeners.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for listener in &self.listeners {
            listener(&snapshot);
        }
    }
}

impl Default for AccountLedger {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for AccountLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountLedger")
            .field("account_number", &self.account_number)
            .field("checking", &self.checking)
            .field("savings", &self.savings)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

fn ensure_positive(amount: Cents) -> Result<(), LedgerError> {
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount(amount));
    }
    Ok(())
}

fn close_span<T>(mut span: Span, result: &Result<T, LedgerError>) {
    if let Err(err) = result {
        span.set_attribute("error", err.to_string());
    }
    span.end();
}
