use cellgraph_core::{Axis, Reference};
use cellgraph_formula::{
    parse_formula, DefaultEngine, EvaluationContext, FormulaEngine, FormulaTextRewriter,
};
use pretty_assertions::assert_eq;

/// Rewrites keep formulas parseable, and the parse sees the moved references
#[test]
fn rewritten_formulas_still_parse() {
    let formulas = [
        "SUM(Sheet1!A1:A10)*2",
        "IF(B5>0,'Q1 Data'!C3,\"B5 is empty\")",
        "AVERAGE(3:7)+COUNT(C:C)",
        "$A$1+A$2+$A3",
    ];

    for formula in formulas {
        for index in [1, 3, 5, 10] {
            let inserted =
                FormulaTextRewriter::replace_row_number(formula, "Sheet1", "Sheet1", index, 1);
            let deleted =
                FormulaTextRewriter::delete_line(formula, "Sheet1", "Sheet1", Axis::Row, index);
            for text in [inserted, deleted] {
                assert!(parse_formula(&text).is_ok(), "{formula} -> {text}");
            }
        }
    }
}

#[test]
fn insert_then_delete_restores_the_formula() {
    let formula = "SUM(Sheet1!B2:D9)+'Q1 Data'!A7+Sheet1!$C$12";
    let inserted = FormulaTextRewriter::replace_row_number(formula, "Other", "Sheet1", 5, 1);
    assert_eq!(inserted, "SUM(Sheet1!B2:D10)+'Q1 Data'!A7+Sheet1!$C$13");

    let restored = FormulaTextRewriter::delete_line(&inserted, "Other", "Sheet1", Axis::Row, 5);
    assert_eq!(restored, formula);
}

#[test]
fn column_edits_leave_row_bands_alone() {
    let formula = "SUM(2:4)+SUM(B:D)+C3";
    assert_eq!(
        FormulaTextRewriter::replace_column_number(formula, "Sheet1", "Sheet1", 2, 1),
        "SUM(2:4)+SUM(C:E)+D3"
    );
    assert_eq!(
        FormulaTextRewriter::delete_line(formula, "Sheet1", "Sheet1", Axis::Column, 3),
        "SUM(2:4)+SUM(B:C)+#REF!"
    );
}

#[test]
fn deleting_a_row_on_another_sheet() {
    // Property from the row-deletion example
    assert_eq!(
        FormulaTextRewriter::delete_line("Sheet1!F30+1", "Summary", "Sheet1", Axis::Row, 30),
        "#REF!+1"
    );
    assert_eq!(
        FormulaTextRewriter::delete_line("Sheet1!F29:H34", "Summary", "Sheet1", Axis::Row, 30),
        "Sheet1!F29:H33"
    );
    // Same text on the deleted sheet itself, unqualified
    assert_eq!(
        FormulaTextRewriter::remove_reference(
            "F30+F29:H34",
            "Sheet1",
            &Reference::row_band("Sheet1", 30, 30),
            Axis::Row
        ),
        "#REF!+F29:H33"
    );
}

#[test]
fn invalidated_formulas_evaluate_to_ref() {
    let text = FormulaTextRewriter::delete_line("A2*3", "Sheet1", "Sheet1", Axis::Row, 2);
    let value = DefaultEngine
        .evaluate(&text, &EvaluationContext::simple())
        .unwrap();
    assert_eq!(value.get_error(), Some(cellgraph_core::CellError::Ref));
}

#[test]
fn shared_formula_translation() {
    // Host at E2 reads A1:A2; followers one and two rows down
    let host = "SUM(A1:A2)";
    assert_eq!(FormulaTextRewriter::translate(host, 1, 0), "SUM(A2:A3)");
    assert_eq!(FormulaTextRewriter::translate(host, 2, 0), "SUM(A3:A4)");
    assert_eq!(FormulaTextRewriter::translate("$A1*B$1", 2, 3), "$A3*E$1");
    assert_eq!(FormulaTextRewriter::translate("A1+1", -1, 0), "#REF!+1");
}
