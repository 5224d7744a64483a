/// Errors raised while interpreting billing input
#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid range: {start} is after {end}")]
    InvertedRange { start: String, end: String },

    #[error("Malformed Pergamo row: {0}")]
    MalformedRow(String),
}
