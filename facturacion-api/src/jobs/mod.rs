pub mod billing_sync;
pub mod cancellation_sync;

pub use billing_sync::BillingSyncManager;
pub use cancellation_sync::CancellationSyncManager;

use crate::config::ApiConfig;
use crate::integrations::{ReportKind, RetryPolicy};
use anyhow::Context;
use billing_rules::parse_iso_date;
use chrono::NaiveDate;

/// Retry policies and rules shared by the sync managers
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub invoice_policy: RetryPolicy,
    pub rips_policy: RetryPolicy,
    pub cancellation_policy: RetryPolicy,
    pub credit_note_cutoff: NaiveDate,
}

impl SyncSettings {
    pub fn from_config(config: &ApiConfig) -> anyhow::Result<Self> {
        let credit_note_cutoff = parse_iso_date(&config.sync.credit_note_cutoff)
            .context("Invalid sync.credit_note_cutoff")?;

        Ok(Self {
            invoice_policy: RetryPolicy::for_report(&config.pergamo, ReportKind::Invoices),
            rips_policy: RetryPolicy::for_report(&config.pergamo, ReportKind::Rips),
            cancellation_policy: RetryPolicy::for_report(
                &config.pergamo,
                ReportKind::Cancellations,
            ),
            credit_note_cutoff,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::integrations::{PergamoError, ReportKind, ReportSource, RetryPolicy};
    use async_trait::async_trait;
    use billing_rules::MonthRange;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::SyncSettings;

    /// Serves canned report bodies keyed by report kind and month start
    #[derive(Default)]
    pub struct FakeSource {
        bodies: HashMap<(&'static str, String), Value>,
        pub calls: Mutex<Vec<(&'static str, String)>>,
    }

    impl FakeSource {
        pub fn with(mut self, kind: ReportKind, month_start: &str, body: Value) -> Self {
            self.bodies
                .insert((kind.label(), month_start.to_string()), body);
            self
        }

        pub fn call_count(&self, kind: ReportKind) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(label, _)| *label == kind.label())
                .count()
        }
    }

    #[async_trait]
    impl ReportSource for FakeSource {
        async fn fetch_report(
            &self,
            kind: ReportKind,
            range: &MonthRange,
            _token: &str,
        ) -> Result<Value, PergamoError> {
            let key = (kind.label(), range.start_iso());
            self.calls.lock().unwrap().push(key.clone());
            self.bodies
                .get(&key)
                .cloned()
                .ok_or(PergamoError::Status(500))
        }
    }

    pub fn settings() -> SyncSettings {
        let policy = RetryPolicy {
            max_attempts: 3,
            timeout: Duration::from_secs(5),
        };
        SyncSettings {
            invoice_policy: policy,
            rips_policy: policy,
            cancellation_policy: policy,
            credit_note_cutoff: chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        }
    }
}
