//! The pluggable formula engine seam
//!
//! The document model never looks inside formula text itself. It hands the
//! text to a [`FormulaEngine`] together with an [`EvaluationContext`] and asks
//! either for a value or for the references the formula reads.

use crate::ast::FormulaExpr;
use crate::error::FormulaResult;
use crate::evaluator::{evaluate, EvaluationContext, FormulaValue, NameTarget};
use crate::parser::parse_formula;
use cellgraph_core::Reference;
use std::fmt::Debug;

/// Names that expand to expressions mentioning other names stop here.
const MAX_NAME_DEPTH: usize = 16;

/// Operands a formula reads, found without evaluating it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyScan {
    /// Sheet-qualified references, in first-seen order, without duplicates
    pub references: Vec<Reference>,
    /// Every defined name mentioned, directly or through another name
    pub names: Vec<String>,
    /// Names the resolver did not know about
    pub unresolved_names: Vec<String>,
}

impl DependencyScan {
    fn push_reference(&mut self, reference: Reference) {
        if !self.references.contains(&reference) {
            self.references.push(reference);
        }
    }

    fn push_name(list: &mut Vec<String>, name: &str) {
        if !list.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            list.push(name.to_string());
        }
    }
}

/// Parses and evaluates formula text
pub trait FormulaEngine: Debug + Send + Sync {
    /// Evaluate `formula` for the cell described by `ctx`
    fn evaluate(&self, formula: &str, ctx: &EvaluationContext) -> FormulaResult<FormulaValue>;

    /// List the references `formula` reads, resolving names through `ctx`
    fn dependencies(&self, formula: &str, ctx: &EvaluationContext)
        -> FormulaResult<DependencyScan>;
}

/// The built-in recursive-descent engine
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEngine;

impl FormulaEngine for DefaultEngine {
    fn evaluate(&self, formula: &str, ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
        let expr = parse_formula(formula)?;
        evaluate(&expr, ctx)
    }

    fn dependencies(
        &self,
        formula: &str,
        ctx: &EvaluationContext,
    ) -> FormulaResult<DependencyScan> {
        let expr = parse_formula(formula)?;
        let mut scan = DependencyScan::default();
        collect(&expr, ctx, &mut scan, 0)?;
        Ok(scan)
    }
}

fn collect(
    expr: &FormulaExpr,
    ctx: &EvaluationContext,
    scan: &mut DependencyScan,
    depth: usize,
) -> FormulaResult<()> {
    let mut names = Vec::new();
    expr.walk(&mut |node| match node {
        FormulaExpr::CellRef(reference) | FormulaExpr::RangeRef(reference) => {
            scan.push_reference(ctx.qualify(reference));
        }
        FormulaExpr::NameRef(name) => names.push(name.clone()),
        _ => {}
    });

    for name in names {
        DependencyScan::push_name(&mut scan.names, &name);
        let target = ctx
            .resolver
            .and_then(|resolver| resolver.resolve_name(&name, ctx.sheet));
        match target {
            Some(NameTarget::Reference(reference)) => scan.push_reference(ctx.qualify(&reference)),
            Some(NameTarget::Expression(text)) if depth < MAX_NAME_DEPTH => {
                let nested = parse_formula(&text)?;
                collect(&nested, ctx, scan, depth + 1)?;
            }
            Some(NameTarget::Expression(_)) => {}
            None => DependencyScan::push_name(&mut scan.unresolved_names, &name),
        }
    }
    Ok(())
}
