//! Billing Rules Crate
//!
//! Pure business rules behind the Pergamo synchronization. Nothing in here
//! performs I/O: the API crate fetches, persists and logs, this crate decides.
//!
//! # Modules
//!
//! - `month_range`: splits a date interval into calendar-month chunks
//! - `dates`: strict ISO parsing and lenient parsing of Pergamo dates
//! - `normalize`: invoice-number cleaning and name matching keys
//! - `pergamo`: typed rows decoded from Pergamo report payloads
//! - `period`: CORRIENTE / REMANENTE classification against RIPS service dates
//! - `cancellation`: Anulación / Nota Crédito classification by set membership
//! - `matching`: facility and insurer lookups by loose name
//! - `replacement`: merges replacement-invoice flat-file rows
//!
//! # Example
//!
//! ```rust,ignore
//! use billing_rules::{classify_period, split_iso_range};
//!
//! for range in split_iso_range("2025-01-15", "2025-03-10") {
//!     println!("{} .. {}", range.start, range.end);
//! }
//! ```

pub mod cancellation;
pub mod dates;
pub mod error;
pub mod matching;
pub mod month_range;
pub mod normalize;
pub mod pergamo;
pub mod period;
pub mod replacement;

pub use cancellation::{classify_cancellations, CancellationBatch, ClassifiedCancellation};
pub use dates::{month_index, parse_iso_date, parse_pergamo_date};
pub use error::RulesError;
pub use matching::{FacilityDirectory, InsurerDirectory, InsurerEntry};
pub use month_range::{parse_iso_range, split_by_month, split_iso_range, MonthRange};
pub use normalize::{facility_key, insurer_key, normalize_invoice_number};
pub use pergamo::{decode_rows, parse_amount, CancellationRow, InvoiceRow, RipsRow};
pub use period::{classify_period, ServiceIndex, ServiceWindow};
pub use replacement::{merge_replacement_rows, ReplacementUpdate};
