//! # cellgraph-core
//!
//! Core data types shared by the cellgraph crates.
//!
//! This crate provides the vocabulary the rest of the engine is written in:
//! - [`CellValue`] and [`CellError`] - what a cell holds
//! - [`CellAddress`], [`Reference`] and [`CellRef`] - how cells and areas are addressed
//! - [`NamedRangeCollection`] - workbook and sheet scoped names
//! - [`Column`] - column metadata
//!
//! ## Example
//!
//! ```rust
//! use cellgraph_core::{Reference, ReferenceKind};
//!
//! let r = Reference::from_address("Sheet1!B2:D10", None).unwrap();
//! assert_eq!(r.kind(), ReferenceKind::Range);
//! assert_eq!(r.row_count(), 9);
//! assert_eq!(r.to_address(), "Sheet1!B2:D10");
//! ```

pub mod cell;
pub mod column;
pub mod error;
pub mod named_range;

// Re-exports for convenience
pub use cell::{
    date_to_serial, quote_sheet_name, serial_to_date, sheet_names_equal, AddressOptions, Axis,
    CellAddress, CellError, CellRef, CellValue, Reference, ReferenceKind, RichText,
    SharedString, TextRun,
};
pub use column::Column;
pub use error::{Error, Result};
pub use named_range::{validate_name, NameScope, NamedRange, NamedRangeCollection};

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
