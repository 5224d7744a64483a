pub mod pergamo;

pub use pergamo::{
    fetch_with_retry, PergamoClient, PergamoError, ReportKind, ReportPayload, ReportSource,
    RetryPolicy,
};
