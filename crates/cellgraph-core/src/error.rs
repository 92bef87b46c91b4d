//! Error types for cellgraph-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur across the cellgraph crates
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed address text
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Row index out of bounds
    #[error("Row {0} out of bounds (valid: 1..={1})")]
    RowOutOfBounds(u32, u32),

    /// Column index out of bounds
    #[error("Column {0} out of bounds (valid: 1..={1})")]
    ColumnOutOfBounds(u32, u16),

    /// Sheet not found by name
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// Invalid sheet name
    #[error("Invalid sheet name: {0}")]
    InvalidSheetName(String),

    /// Duplicate sheet name
    #[error("Sheet name already exists: {0}")]
    DuplicateSheetName(String),

    /// Invalid or duplicate defined name
    #[error("Invalid named range: {0}")]
    InvalidName(String),

    /// The dependency graph was asked to store or query something it cannot represent
    #[error("Dependency graph consistency violation: {0}")]
    GraphConsistency(String),

    /// Formula text could not be understood
    #[error("Formula error: {0}")]
    Formula(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    /// True for the out-of-range family (`RowOutOfBounds`, `ColumnOutOfBounds`)
    pub fn is_range_error(&self) -> bool {
        matches!(self, Error::RowOutOfBounds(..) | Error::ColumnOutOfBounds(..))
    }
}
