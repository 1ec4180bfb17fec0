use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, MergeError>;

/// Error type covering the ways a gradebook can fail to load, normalise,
/// merge, or be written back out.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Raised when headers are missing or rows are not uniformly shaped.
    #[error("malformed sheet: {0}")]
    MalformedSheet(String),

    /// Raised when a merge decision references something the datasets do not
    /// contain. Nothing is applied when this is returned.
    #[error("invalid merge decision: {0}")]
    InvalidMergeDecision(String),

    /// Raised when a category index map does not partition the sheet columns.
    #[error("invalid category map: {0}")]
    InvalidCategoryMap(String),

    /// Raised when a column edit names a header the dataset does not have.
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// Raised when a column edit would introduce a second header of the same name.
    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    /// Raised when a workbook lacks the requested sheet.
    #[error("missing sheet '{0}'")]
    MissingSheet(String),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when a file extension maps to no known sheet format.
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
