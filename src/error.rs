use thiserror::Error;

/// Failures callers distinguish. Everything else travels as `anyhow::Error`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("row {row}: total {value:?} for {country:?} is not a non-negative number")]
    MalformedTotal { row: usize, country: String, value: String },

    #[error("unsupported spreadsheet format: {0}")]
    UnsupportedFormat(String),

    #[error("spreadsheet has no worksheet to read")]
    EmptySheet,

    #[error("no canonical country names to match against")]
    NoCandidates,

    #[error("value table is empty")]
    EmptyTable,

    #[error("translation of {text:?} failed: {reason}")]
    Translation { text: String, reason: String },
}
