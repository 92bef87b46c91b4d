//! # cellgraph-formula
//!
//! Formula machinery for cellgraph.
//!
//! This crate provides:
//! - Formula parsing (text → AST) and evaluation (AST → value)
//! - A small set of built-in Excel functions
//! - The [`FormulaEngine`] and [`ReferenceResolver`] seams the document model
//!   plugs into
//! - [`DependencyGraph`], the band-keyed table of which formulas read which cells
//! - [`FormulaTextRewriter`], reference rewriting for row and column edits
//!
//! ## Example
//!
//! ```rust
//! use cellgraph_formula::{DefaultEngine, EvaluationContext, FormulaEngine, FormulaValue};
//!
//! let ctx = EvaluationContext::simple();
//! let value = DefaultEngine.evaluate("=SUM(1, 2, 3) * 2", &ctx).unwrap();
//! assert_eq!(value, FormulaValue::Number(12.0));
//! ```

pub mod ast;
pub mod dependency;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod parser;
pub mod rewrite;

pub use ast::{BinaryOperator, FormulaExpr, UnaryOperator};
pub use dependency::{CalculationOrder, DependencyGraph};
pub use engine::{DefaultEngine, DependencyScan, FormulaEngine};
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{
    evaluate, is_known_function, EvaluationContext, FormulaValue, NameTarget, ReferenceResolver,
};
pub use parser::parse_formula;
pub use rewrite::{FormulaTextRewriter, REF_ERROR};
