//! Prelude module - common imports for cellgraph users
//!
//! ```rust
//! use cellgraph::prelude::*;
//! ```

pub use crate::{
    // Addressing
    Axis,
    CellError,
    CellRef,
    // Cell types
    CellValue,
    // Error types
    Error,
    FormulaType,
    Reference,
    Result,
    // Main types
    Sheet,
    SheetMut,
    Workbook,
    WorkbookSettings,
    // Recalculation
    CalculationStats,
    // Shared formulas
    CascadeClear,
    HostLossPolicy,
    PromoteFollowers,
};
