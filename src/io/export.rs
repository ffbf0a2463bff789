use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::PaymentService;
use crate::domain::{AccountKind, BalanceSnapshot, format_cents};

/// Session snapshot written by a JSON export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerExport {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub snapshot: BalanceSnapshot,
}

/// Exporter for writing the current balances in various formats
pub struct Exporter<'a> {
    service: &'a PaymentService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a PaymentService) -> Self {
        Self { service }
    }

    /// Export balances to CSV format, one row per account
    pub fn export_balances_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let snapshot = self.service.balances();
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["account_number", "account", "balance"])?;

        let mut count = 0;
        for account in AccountKind::ALL {
            csv_writer.write_record([
                snapshot.account_number.as_str(),
                account.as_str(),
                format_cents(snapshot.balance(account)).as_str(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export balances as a JSON snapshot
    pub fn export_snapshot_json<W: Write>(&self, mut writer: W) -> Result<LedgerExport> {
        let export = LedgerExport {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            snapshot: self.service.balances(),
        };

        let json = serde_json::to_string_pretty(&export)?;
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        Ok(export)
    }
}
