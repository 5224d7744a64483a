use chrono::NaiveDate;
use shared_types::Period;
use std::collections::HashMap;

use crate::dates::month_index;
use crate::normalize::normalize_invoice_number;

/// Service dates of an invoice, aggregated over its RIPS lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl ServiceWindow {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// Widens the window to cover `other`.
    pub fn merge(&mut self, other: ServiceWindow) {
        self.start = match (self.start, other.start) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.end = match (self.end, other.end) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    /// Date whose month is compared with the billing month
    pub fn reference_date(&self) -> Option<NaiveDate> {
        self.end.or(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Labels an invoice CORRIENTE or REMANENTE from its RIPS service window.
///
/// The service month is the end month (start month when the end is
/// missing). Two or more calendar months before the billing month is
/// REMANENTE; the immediately preceding month, the same month, a later
/// month and a missing window are all CORRIENTE.
pub fn classify_period(billing_date: NaiveDate, service: Option<&ServiceWindow>) -> Period {
    let Some(reference) = service.and_then(|s| s.reference_date()) else {
        return Period::Corriente;
    };

    let gap = month_index(billing_date) - month_index(reference);
    if gap >= 2 {
        Period::Remanente
    } else {
        Period::Corriente
    }
}

/// RIPS service windows keyed by normalized invoice number
#[derive(Debug, Default)]
pub struct ServiceIndex {
    windows: HashMap<String, ServiceWindow>,
}

impl ServiceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one RIPS line; lines of the same invoice widen its window.
    pub fn insert(&mut self, invoice_number: &str, window: ServiceWindow) {
        let key = normalize_invoice_number(invoice_number);
        if key.is_empty() || window.is_empty() {
            return;
        }
        self.windows
            .entry(key)
            .and_modify(|existing| existing.merge(window))
            .or_insert(window);
    }

    pub fn get(&self, invoice_number: &str) -> Option<&ServiceWindow> {
        self.windows.get(&normalize_invoice_number(invoice_number))
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}
