//! Text-level rewriting of references inside formula source
//!
//! Structural edits move or destroy the cells a formula points at. Rather
//! than parse and re-serialize the whole expression, the rewriter finds
//! reference tokens in the text and edits only those, so everything else in
//! the formula (spacing, function names, literals) survives byte for byte.
//!
//! String literals are masked before matching, so `"A1"` inside quotes is
//! never treated as a reference.

use cellgraph_core::{sheet_names_equal, Axis, CellAddress, Reference};
use lazy_regex::{lazy_regex, Lazy, Regex};

/// Replacement text for a reference that no longer points anywhere
pub const REF_ERROR: &str = "#REF!";

/// Reference grammar: optional sheet prefix, then a cell range, a row band,
/// a column band or a single cell (tried in that order).
static REFERENCE: Lazy<Regex> = lazy_regex!(
    r"(?x)
    (?P<sheet>(?:'(?:[^'\\/\[\]*?:]|'')+'|[A-Za-z_.\d\x{7F}-\x{FFFF}]+)!)?
    (?:
        (?P<ra>\$)?(?P<rc1>[A-Za-z]{1,3})(?P<rb>\$)?(?P<rr1>\d{1,7})
        :(?P<rc>\$)?(?P<rc2>[A-Za-z]{1,3})(?P<rd>\$)?(?P<rr2>\d{1,7})
      | (?P<ba>\$)?(?P<b1>\d{1,7}):(?P<bb>\$)?(?P<b2>\d{1,7})
      | (?P<ka>\$)?(?P<k1>[A-Za-z]{1,3}):(?P<kb>\$)?(?P<k2>[A-Za-z]{1,3})
      | (?P<ca>\$)?(?P<c>[A-Za-z]{1,3})(?P<cb>\$)?(?P<cr>\d{1,7})
    )"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Line {
    index: u32,
    absolute: bool,
}

/// A reference token as written. Corners keep their written order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Cell(CellAddress),
    Range(CellAddress, CellAddress),
    Rows(Line, Line),
    Columns(Line, Line),
}

fn line_of(addr: &CellAddress, axis: Axis) -> Line {
    match axis {
        Axis::Row => Line {
            index: addr.row,
            absolute: addr.row_absolute,
        },
        Axis::Column => Line {
            index: addr.col as u32,
            absolute: addr.col_absolute,
        },
    }
}

fn set_line(mut addr: CellAddress, axis: Axis, line: Line) -> CellAddress {
    match axis {
        Axis::Row => {
            addr.row = line.index;
            addr.row_absolute = line.absolute;
        }
        Axis::Column => {
            addr.col = line.index as u16;
            addr.col_absolute = line.absolute;
        }
    }
    addr
}

impl Token {
    /// The two lines the token spans along `axis`, in written order.
    /// `None` when the token covers the whole axis (a band across it).
    fn lines(&self, axis: Axis) -> Option<(Line, Line)> {
        match (self, axis) {
            (Token::Cell(a), _) => Some((line_of(a, axis), line_of(a, axis))),
            (Token::Range(a, b), _) => Some((line_of(a, axis), line_of(b, axis))),
            (Token::Rows(a, b), Axis::Row) | (Token::Columns(a, b), Axis::Column) => {
                Some((*a, *b))
            }
            _ => None,
        }
    }

    fn with_lines(self, axis: Axis, (first, second): (Line, Line)) -> Token {
        match self {
            Token::Cell(a) => Token::Cell(set_line(a, axis, first)),
            Token::Range(a, b) => Token::Range(set_line(a, axis, first), set_line(b, axis, second)),
            Token::Rows(..) if axis == Axis::Row => Token::Rows(first, second),
            Token::Columns(..) if axis == Axis::Column => Token::Columns(first, second),
            other => other,
        }
    }

    fn is_point(&self) -> bool {
        matches!(self, Token::Cell(_))
    }

    fn render(&self) -> String {
        match self {
            Token::Cell(a) => a.to_a1_string(),
            Token::Range(a, b) => format!("{}:{}", a.to_a1_string(), b.to_a1_string()),
            Token::Rows(a, b) => format!(
                "{}{}:{}{}",
                dollar(a.absolute),
                a.index,
                dollar(b.absolute),
                b.index
            ),
            Token::Columns(a, b) => format!(
                "{}{}:{}{}",
                dollar(a.absolute),
                CellAddress::column_to_letters(a.index as u16),
                dollar(b.absolute),
                CellAddress::column_to_letters(b.index as u16)
            ),
        }
    }
}

fn dollar(absolute: bool) -> &'static str {
    if absolute {
        "$"
    } else {
        ""
    }
}

/// A token together with its sheet qualifier
#[derive(Debug, Clone)]
struct RefToken<'a> {
    /// Prefix text as written, including the `!`
    prefix: &'a str,
    /// Unquoted sheet name, if qualified
    sheet: Option<String>,
    token: Token,
}

impl RefToken<'_> {
    fn on_sheet(&self, current_sheet: &str, target_sheet: &str) -> bool {
        sheet_names_equal(self.sheet.as_deref().unwrap_or(current_sheet), target_sheet)
    }
}

enum Edit {
    Keep,
    Replace(Token),
    Invalid,
}

/// Pure text transforms applied to formulas when rows or columns move
#[derive(Debug, Clone, Copy, Default)]
pub struct FormulaTextRewriter;

impl FormulaTextRewriter {
    /// Invalidate or shrink references that contain the deleted cell or line
    ///
    /// A single-cell token matching `deleted` becomes `#REF!`. A range or band
    /// containing the deleted index along `axis` loses one line at its end,
    /// or becomes `#REF!` when that was its only line.
    pub fn remove_reference(
        formula: &str,
        current_sheet: &str,
        deleted: &Reference,
        axis: Axis,
    ) -> String {
        let target = deleted.sheet.as_deref().unwrap_or(current_sheet);
        let (index, _) = deleted.extent(axis);
        let cross = deleted.extent(axis.cross());

        rewrite_tokens(formula, |t| {
            if !t.on_sheet(current_sheet, target) {
                return Edit::Keep;
            }
            let Some(lines) = t.token.lines(axis) else {
                return Edit::Keep;
            };
            if let Some(cross_lines) = t.token.lines(axis.cross()) {
                let (lo, hi) = sorted(cross_lines);
                if hi < cross.0 || lo > cross.1 {
                    return Edit::Keep;
                }
            }
            let (lo, hi) = sorted(lines);
            if index < lo || index > hi {
                return Edit::Keep;
            }
            if lo == hi {
                return Edit::Invalid;
            }
            Edit::Replace(t.token.with_lines(axis, map_lines(lines, |i| if i == hi { hi - 1 } else { i })))
        })
    }

    /// Shift row numbers `>= changed_row` on `target_sheet` by `offset`
    pub fn replace_row_number(
        formula: &str,
        current_sheet: &str,
        target_sheet: &str,
        changed_row: u32,
        offset: i32,
    ) -> String {
        Self::replace_line_number(formula, current_sheet, target_sheet, Axis::Row, changed_row, offset)
    }

    /// Shift column numbers `>= changed_col` on `target_sheet` by `offset`
    pub fn replace_column_number(
        formula: &str,
        current_sheet: &str,
        target_sheet: &str,
        changed_col: u32,
        offset: i32,
    ) -> String {
        Self::replace_line_number(
            formula,
            current_sheet,
            target_sheet,
            Axis::Column,
            changed_col,
            offset,
        )
    }

    /// Shift every line `>= changed` along `axis` by `offset`.
    ///
    /// Shifted values never drop below 1. A cell pushed past the last line
    /// becomes `#REF!`; a range keeps whatever part still fits. A range whose
    /// end would land before its start collapses to `#REF!`.
    pub fn replace_line_number(
        formula: &str,
        current_sheet: &str,
        target_sheet: &str,
        axis: Axis,
        changed: u32,
        offset: i32,
    ) -> String {
        let max = axis.max_index() as i64;
        rewrite_tokens(formula, |t| {
            if !t.on_sheet(current_sheet, target_sheet) {
                return Edit::Keep;
            }
            let Some(lines) = t.token.lines(axis) else {
                return Edit::Keep;
            };
            let shift = |i: u32| -> i64 {
                if i >= changed {
                    (i as i64 + offset as i64).max(1)
                } else {
                    i as i64
                }
            };
            let (lo, hi) = sorted(lines);
            let (new_lo, new_hi) = (shift(lo), shift(hi));
            if new_lo > new_hi || new_lo > max {
                return Edit::Invalid;
            }
            if new_hi > max && t.token.is_point() {
                return Edit::Invalid;
            }
            let clamp = |i: u32| shift(i).min(max) as u32;
            if new_lo == lo as i64 && new_hi == hi as i64 {
                return Edit::Keep;
            }
            Edit::Replace(t.token.with_lines(axis, map_lines(lines, clamp)))
        })
    }

    /// Rewrite for the deletion of line `index` along `axis` in one pass
    ///
    /// Tokens that contain the deleted line follow the
    /// [`remove_reference`](Self::remove_reference) rule; tokens entirely
    /// past it move back by one.
    pub fn delete_line(
        formula: &str,
        current_sheet: &str,
        target_sheet: &str,
        axis: Axis,
        index: u32,
    ) -> String {
        rewrite_tokens(formula, |t| {
            if !t.on_sheet(current_sheet, target_sheet) {
                return Edit::Keep;
            }
            let Some(lines) = t.token.lines(axis) else {
                return Edit::Keep;
            };
            let (lo, hi) = sorted(lines);
            if hi < index {
                Edit::Keep
            } else if lo > index {
                Edit::Replace(t.token.with_lines(axis, map_lines(lines, |i| i - 1)))
            } else if lo == hi {
                Edit::Invalid
            } else {
                Edit::Replace(t.token.with_lines(axis, map_lines(lines, |i| if i == hi { hi - 1 } else { i })))
            }
        })
    }

    /// Move every relative reference by the given offsets
    ///
    /// `$`-anchored parts stay put. Used to derive a shared-formula member's
    /// text from its host.
    pub fn translate(formula: &str, row_offset: i64, col_offset: i64) -> String {
        rewrite_tokens(formula, |t| {
            let mut token = t.token;
            for (axis, offset) in [(Axis::Row, row_offset), (Axis::Column, col_offset)] {
                if offset == 0 {
                    continue;
                }
                let Some((first, second)) = token.lines(axis) else {
                    continue;
                };
                let max = axis.max_index() as i64;
                let mut moved = [first, second];
                for line in moved.iter_mut().filter(|l| !l.absolute) {
                    let index = line.index as i64 + offset;
                    if index < 1 || index > max {
                        return Edit::Invalid;
                    }
                    line.index = index as u32;
                }
                token = token.with_lines(axis, (moved[0], moved[1]));
            }
            if token == t.token {
                Edit::Keep
            } else {
                Edit::Replace(token)
            }
        })
    }
}

fn sorted((a, b): (Line, Line)) -> (u32, u32) {
    (a.index.min(b.index), a.index.max(b.index))
}

fn map_lines((a, b): (Line, Line), f: impl Fn(u32) -> u32) -> (Line, Line) {
    (
        Line {
            index: f(a.index),
            ..a
        },
        Line {
            index: f(b.index),
            ..b
        },
    )
}

/// Split formula text into (is_code, text) segments, masking `"..."` literals
fn segments(formula: &str) -> Vec<(bool, &str)> {
    let mut out = Vec::new();
    let bytes = formula.as_bytes();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'"' {
            i += 1;
            continue;
        }
        if i > start {
            out.push((true, &formula[start..i]));
        }
        let literal_start = i;
        i += 1;
        while i < bytes.len() {
            if bytes[i] == b'"' {
                if bytes.get(i + 1) == Some(&b'"') {
                    i += 2;
                    continue;
                }
                i += 1;
                break;
            }
            i += 1;
        }
        out.push((false, &formula[literal_start..i]));
        start = i;
    }
    if start < formula.len() {
        out.push((true, &formula[start..]));
    }
    out
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

/// Run `edit` over every reference token outside string literals
fn rewrite_tokens(formula: &str, mut edit: impl FnMut(&RefToken<'_>) -> Edit) -> String {
    let mut out = String::with_capacity(formula.len() + 8);

    for (is_code, text) in segments(formula) {
        if !is_code {
            out.push_str(text);
            continue;
        }

        let mut last = 0;
        for caps in REFERENCE.captures_iter(text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let before = text[..whole.start()].chars().next_back();
            let after = text[whole.end()..].chars().next();

            if before.map_or(false, |c| is_identifier_char(c) || matches!(c, '$' | '#')) {
                continue;
            }
            // Function calls, names and the first half of something longer
            if after.map_or(false, |c| is_identifier_char(c) || matches!(c, '(' | '!' | ':' | '$')) {
                continue;
            }
            let Some(token) = parse_token(&caps) else {
                continue;
            };

            let replacement = match edit(&token) {
                Edit::Keep => continue,
                Edit::Replace(new) => format!("{}{}", token.prefix, new.render()),
                Edit::Invalid => REF_ERROR.to_string(),
            };
            out.push_str(&text[last..whole.start()]);
            out.push_str(&replacement);
            last = whole.end();
        }
        out.push_str(&text[last..]);
    }
    out
}

fn parse_token<'a>(caps: &regex::Captures<'a>) -> Option<RefToken<'a>> {
    let flag = |name: &str| caps.name(name).is_some();
    let text = |name: &str| caps.name(name).map(|m| m.as_str());

    let address = |col: &str, col_abs: &str, row: &str, row_abs: &str| -> Option<CellAddress> {
        let col = CellAddress::letters_to_column(text(col)?).ok()?;
        let row = row_number(text(row)?, Axis::Row)?;
        Some(CellAddress::with_absolute(row, col, flag(row_abs), flag(col_abs)))
    };

    let token = if caps.name("rc1").is_some() {
        Token::Range(
            address("rc1", "ra", "rr1", "rb")?,
            address("rc2", "rc", "rr2", "rd")?,
        )
    } else if caps.name("b1").is_some() {
        Token::Rows(
            Line {
                index: row_number(text("b1")?, Axis::Row)?,
                absolute: flag("ba"),
            },
            Line {
                index: row_number(text("b2")?, Axis::Row)?,
                absolute: flag("bb"),
            },
        )
    } else if caps.name("k1").is_some() {
        Token::Columns(
            Line {
                index: CellAddress::letters_to_column(text("k1")?).ok()? as u32,
                absolute: flag("ka"),
            },
            Line {
                index: CellAddress::letters_to_column(text("k2")?).ok()? as u32,
                absolute: flag("kb"),
            },
        )
    } else {
        Token::Cell(address("c", "ca", "cr", "cb")?)
    };

    let prefix = caps.name("sheet").map_or("", |m| m.as_str());
    let sheet = caps.name("sheet").map(|m| unquote(m.as_str()));

    Some(RefToken {
        prefix,
        sheet,
        token,
    })
}

fn row_number(digits: &str, axis: Axis) -> Option<u32> {
    let n: u32 = digits.parse().ok()?;
    (n >= 1 && n <= axis.max_index()).then_some(n)
}

/// `'Bob''s'!` -> `Bob's`, `Sheet1!` -> `Sheet1`
fn unquote(prefix: &str) -> String {
    let name = prefix.strip_suffix('!').unwrap_or(prefix);
    match name.strip_prefix('\'').and_then(|n| n.strip_suffix('\'')) {
        Some(quoted) => quoted.replace("''", "'"),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    type R = FormulaTextRewriter;

    #[test]
    fn test_insert_shifts_qualified_cell() {
        assert_eq!(
            R::replace_row_number("Fin_CMHP1!F29", "Summary", "Fin_CMHP1", 29, 1),
            "Fin_CMHP1!F30"
        );
        assert_eq!(
            R::replace_row_number("Fin_CMHP1!F28", "Summary", "Fin_CMHP1", 29, 1),
            "Fin_CMHP1!F28"
        );
    }

    #[test]
    fn test_unqualified_uses_current_sheet() {
        assert_eq!(R::replace_row_number("A5+B10", "Sheet1", "Sheet1", 6, 1), "A5+B11");
        assert_eq!(R::replace_row_number("A5+B10", "Sheet2", "Sheet1", 6, 1), "A5+B10");
        assert_eq!(R::replace_row_number("A5+B10", "sheet1", "SHEET1", 6, 1), "A5+B11");
    }

    #[test]
    fn test_anchors_shift_too() {
        assert_eq!(
            R::replace_row_number("SUM($A$1:$A$10)", "S", "S", 5, 1),
            "SUM($A$1:$A$11)"
        );
        assert_eq!(
            R::replace_column_number("$B$2*C$3", "S", "S", 2, 1),
            "$C$2*D$3"
        );
    }

    #[test]
    fn test_bands() {
        assert_eq!(R::replace_row_number("SUM(3:5)", "S", "S", 4, 1), "SUM(3:6)");
        assert_eq!(R::replace_row_number("SUM(C:E)", "S", "S", 1, 1), "SUM(C:E)");
        assert_eq!(R::replace_column_number("SUM(C:$E)", "S", "S", 4, 2), "SUM(C:$G)");
        assert_eq!(R::replace_column_number("SUM(3:5)", "S", "S", 1, 1), "SUM(3:5)");
    }

    #[test]
    fn test_negative_offset() {
        assert_eq!(R::replace_row_number("A5", "S", "S", 3, -1), "A4");
        assert_eq!(R::replace_row_number("A1:A5", "S", "S", 1, -3), "A1:A2");
        // end lands before start
        assert_eq!(R::replace_row_number("A2:A5", "S", "S", 4, -4), REF_ERROR);
    }

    #[test]
    fn test_pushed_off_grid() {
        assert_eq!(R::replace_row_number("A1048576+1", "S", "S", 10, 1), "#REF!+1");
        assert_eq!(
            R::replace_row_number("SUM(A10:A1048576)", "S", "S", 10, 1),
            "SUM(A11:A1048576)"
        );
        assert_eq!(R::replace_column_number("XFD1", "S", "S", 1, 1), REF_ERROR);
    }

    #[test]
    fn test_remove_reference() {
        let deleted = Reference::cell("Sheet1", 30, 6);
        assert_eq!(
            R::remove_reference("Sheet1!F30+1", "Other", &deleted, Axis::Row),
            "#REF!+1"
        );
        assert_eq!(
            R::remove_reference("Sheet1!F29:H34", "Other", &deleted, Axis::Row),
            "Sheet1!F29:H33"
        );
        // different column
        assert_eq!(
            R::remove_reference("Sheet1!G30", "Other", &deleted, Axis::Row),
            "Sheet1!G30"
        );
        // one-row range
        assert_eq!(
            R::remove_reference("SUM(Sheet1!F30:H30)", "Other", &deleted, Axis::Row),
            "SUM(#REF!)"
        );
        assert_eq!(
            R::remove_reference("Other!F30", "Other", &deleted, Axis::Row),
            "Other!F30"
        );
    }

    #[test]
    fn test_delete_line() {
        let del = |f: &str| R::delete_line(f, "Other", "Sheet1", Axis::Row, 30);
        assert_eq!(del("Sheet1!F30+1"), "#REF!+1");
        assert_eq!(del("Sheet1!F29:H34"), "Sheet1!F29:H33");
        assert_eq!(del("Sheet1!F30:H34"), "Sheet1!F30:H33");
        assert_eq!(del("Sheet1!F31"), "Sheet1!F30");
        assert_eq!(del("Sheet1!F29"), "Sheet1!F29");
        assert_eq!(del("SUM(Sheet1!30:30)"), "SUM(#REF!)");
        assert_eq!(del("SUM(Sheet1!31:40)"), "SUM(Sheet1!30:39)");
        assert_eq!(del("SUM(Sheet1!F:F)"), "SUM(Sheet1!F:F)");
    }

    #[test]
    fn test_reversed_corners() {
        assert_eq!(
            R::delete_line("SUM(B34:A29)", "S", "S", Axis::Row, 30),
            "SUM(B33:A29)"
        );
    }

    #[test]
    fn test_string_literals_masked() {
        assert_eq!(
            R::replace_row_number(r#"IF(A1>0,"A1",A1&"say ""B2""")"#, "S", "S", 1, 1),
            r#"IF(A2>0,"A1",A2&"say ""B2""")"#
        );
    }

    #[test]
    fn test_function_names_and_identifiers() {
        assert_eq!(R::replace_row_number("LOG10(A10)", "S", "S", 1, 1), "LOG10(A11)");
        assert_eq!(R::replace_row_number("ATAN2(A1,B1)", "S", "S", 1, 1), "ATAN2(A2,B2)");
        assert_eq!(R::replace_row_number("Sales_2024*2", "S", "S", 1, 1), "Sales_2024*2");
        assert_eq!(R::replace_row_number("#REF!+A1", "S", "S", 1, 1), "#REF!+A2");
    }

    #[test]
    fn test_quoted_sheets() {
        assert_eq!(
            R::replace_row_number("'Q1 Data'!B7*2", "S", "Q1 Data", 5, 2),
            "'Q1 Data'!B9*2"
        );
        assert_eq!(
            R::replace_row_number("'Bob''s'!A1", "S", "Bob's", 1, 1),
            "'Bob''s'!A2"
        );
    }

    #[test]
    fn test_translate() {
        assert_eq!(R::translate("SUM(A1:A2)", 1, 0), "SUM(A2:A3)");
        assert_eq!(R::translate("SUM(A1:A2)", 2, 0), "SUM(A3:A4)");
        assert_eq!(R::translate("$A1+A$1+$A$1", 2, 3), "$A3+D$1+$A$1");
        assert_eq!(R::translate("SUM(2:3)+SUM(B:B)", 1, 1), "SUM(3:4)+SUM(C:C)");
        assert_eq!(R::translate("A1+1", -1, 0), "#REF!+1");
        assert_eq!(R::translate("Other!B2", 1, 1), "Other!C3");
    }

    #[test]
    fn test_leading_equals_kept() {
        assert_eq!(R::replace_row_number("=A1", "S", "S", 1, 1), "=A2");
    }
}
