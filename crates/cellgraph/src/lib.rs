//! # cellgraph
//!
//! An in-memory spreadsheet engine that keeps formula results current.
//!
//! Every formula's operands are registered in a band-keyed
//! [`DependencyGraph`]. Writing a value or a formula recalculates exactly the
//! cells downstream of it, in dependency order, before the write returns.
//! Inserting or deleting rows and columns rewrites every formula and named
//! range that points past the edit.
//!
//! ## Features
//!
//! - Values, normal formulas and shared formula groups
//! - Incremental and full recalculation, with `#CIRC!` for cycles
//! - Workbook and sheet scoped named ranges
//! - Row and column insertion and deletion with `#REF!` invalidation
//! - A pluggable [`FormulaEngine`]
//!
//! ## Example
//!
//! ```rust
//! use cellgraph::prelude::*;
//!
//! let mut workbook = Workbook::new();
//! workbook.cell_mut("A1").unwrap().set_value(10.0).unwrap();
//! workbook.cell_mut("A2").unwrap().set_value(32.0).unwrap();
//! workbook.cell_mut("A3").unwrap().set_formula("=SUM(A1:A2)").unwrap();
//! assert_eq!(workbook.value("A3").unwrap(), CellValue::Number(42.0));
//!
//! // Rows above the sum move it and its operands down
//! workbook.sheet_mut("Sheet1").unwrap().insert_row(1).unwrap();
//! assert_eq!(workbook.formula("A4").unwrap().as_deref(), Some("SUM(A2:A3)"));
//! ```

mod binding;
mod cell;
mod recalc;
mod row;
mod shared;
mod sheet;
mod structure;
mod workbook;

pub mod prelude;

pub use binding::WorkbookResolver;
pub use cell::{Cell, CellMut, FormulaType};
pub use recalc::CalculationStats;
pub use row::Row;
pub use shared::{
    CascadeClear, HostLossAction, HostLossPolicy, PromoteFollowers, SharedFormulaGroup,
};
pub use sheet::{Sheet, SheetMut};
pub use workbook::{Workbook, WorkbookSettings};

// Re-export core types
pub use cellgraph_core::{
    Axis, CellAddress, CellError, CellRef, CellValue, Column, Error, NameScope, NamedRange,
    NamedRangeCollection, Reference, ReferenceKind, Result, RichText, MAX_COLS, MAX_ROWS,
};

// Re-export the formula machinery
pub use cellgraph_formula::{
    CalculationOrder, DefaultEngine, DependencyGraph, DependencyScan, EvaluationContext,
    FormulaEngine, FormulaError, FormulaResult, FormulaTextRewriter, FormulaValue, NameTarget,
    ReferenceResolver,
};
