//! Cell-related types and utilities
//!
//! This module contains:
//! - [`CellValue`] - The value stored in a cell
//! - [`CellAddress`] - A cell's location (e.g., "A1")
//! - [`Reference`] - A cell, range, row band or column band on a sheet
//! - [`CellRef`] - The identity of one cell (sheet plus coordinates)

mod address;
mod reference;
mod value;

pub use address::CellAddress;
pub use reference::{
    quote_sheet_name, sheet_names_equal, AddressOptions, Axis, CellRef, Reference, ReferenceKind,
};
pub use value::{
    date_to_serial, serial_to_date, CellError, CellValue, RichText, SharedString, TextRun,
};
