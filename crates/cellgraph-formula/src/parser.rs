//! Formula parser
//!
//! Tokenizer plus a precedence-climbing parser. Besides cells and ranges it
//! understands whole-row and whole-column bands (`3:5`, `C:E`) and quoted
//! sheet names.

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use cellgraph_core::{CellAddress, CellError, Reference, MAX_COLS, MAX_ROWS};

/// Parse a formula string into an AST
///
/// The leading `=` is optional.
///
/// # Example
/// ```rust
/// use cellgraph_formula::parse_formula;
///
/// let ast = parse_formula("=1+2").unwrap();
/// let ast = parse_formula("SUM(A1:A10)").unwrap();
/// let ast = parse_formula("=IF(A1>0,\"Yes\",\"No\")").unwrap();
/// let ast = parse_formula("SUM('Q1 Data'!3:5)").unwrap();
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<FormulaExpr> {
    let formula = formula.trim();
    let formula = formula.strip_prefix('=').unwrap_or(formula);
    if formula.trim().is_empty() {
        return Err(FormulaError::Parse("empty formula".into()));
    }

    let mut parser = FormulaParser::new(formula);
    let expr = parser.parse_expression()?;
    match parser.current_token() {
        Token::Eof => Ok(expr),
        trailing => Err(FormulaError::Parse(format!(
            "Unexpected {:?} after expression",
            trailing
        ))),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    String(String),
    Boolean(bool),
    Error(CellError),
    /// Function or defined name
    Identifier(String),
    /// `A1`, `$B$2`
    CellRef(String),
    /// Sheet prefix with the `!` and any quoting removed
    SheetRef(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    Ampersand,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Colon,
    Comma,
    Semicolon,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    /// Character that starts no token
    Invalid(char),
    Eof,
}

/// Formula parser
struct FormulaParser<'a> {
    input: &'a str,
    pos: usize,
    current_token: Option<Token>,
}

impl<'a> FormulaParser<'a> {
    fn new(input: &'a str) -> Self {
        let mut parser = Self {
            input,
            pos: 0,
            current_token: None,
        };
        parser.advance_token();
        parser
    }

    fn advance_token(&mut self) {
        self.skip_whitespace();
        self.current_token = Some(self.scan_token());
    }

    fn scan_token(&mut self) -> Token {
        let Some(c) = self.peek_char() else {
            return Token::Eof;
        };

        if let Some(token) = punctuation(c) {
            self.advance();
            return token;
        }

        match c {
            '<' | '>' => self.scan_comparison(c),
            '"' => self.scan_string(),
            '\'' => self.scan_quoted_sheet(),
            '.' if self.peek_char_at(1).is_some_and(|d| d.is_ascii_digit()) => self.scan_number(),
            _ if c.is_ascii_digit() => self.scan_number(),
            _ if c.is_alphabetic() || matches!(c, '_' | '$' | '#' | '\\') => {
                self.scan_identifier_or_ref()
            }
            _ => {
                self.advance();
                Token::Invalid(c)
            }
        }
    }

    /// `<`, `<=`, `<>`, `>` or `>=`
    fn scan_comparison(&mut self, first: char) -> Token {
        self.advance();
        let token = match (first, self.peek_char()) {
            ('<', Some('=')) => Token::LessEqual,
            ('<', Some('>')) => Token::NotEqual,
            ('>', Some('=')) => Token::GreaterEqual,
            ('<', _) => return Token::LessThan,
            _ => return Token::GreaterThan,
        };
        self.advance();
        token
    }

    /// `'Bob''s data'!` -> SheetRef("Bob's data")
    fn scan_quoted_sheet(&mut self) -> Token {
        self.advance(); // Skip opening quote

        let mut name = String::new();
        while let Some(c) = self.peek_char() {
            self.advance();
            if c != '\'' {
                name.push(c);
                continue;
            }
            if self.peek_char() == Some('\'') {
                name.push('\'');
                self.advance();
                continue;
            }
            if self.peek_char() == Some('!') && !name.is_empty() {
                self.advance();
                return Token::SheetRef(name);
            }
            break;
        }
        Token::Invalid('\'')
    }

    /// `"say ""hi"""` -> String(`say "hi"`). An unterminated literal runs to
    /// the end of the input.
    fn scan_string(&mut self) -> Token {
        self.advance();
        let mut text = String::new();
        while let Some(c) = self.peek_char() {
            self.advance();
            match c {
                '"' if self.peek_char() == Some('"') => {
                    text.push('"');
                    self.advance();
                }
                '"' => break,
                _ => text.push(c),
            }
        }
        Token::String(text)
    }

    /// `12`, `.5`, `1.25e-3`
    fn scan_number(&mut self) -> Token {
        let start = self.pos;
        self.skip_digits();
        if self.peek_char() == Some('.') {
            self.advance();
            self.skip_digits();
        }
        if matches!(self.peek_char(), Some('e' | 'E')) {
            self.advance();
            if matches!(self.peek_char(), Some('+' | '-')) {
                self.advance();
            }
            self.skip_digits();
        }
        Token::Number(self.input[start..self.pos].parse().unwrap_or(0.0))
    }

    fn skip_digits(&mut self) {
        self.eat_while(|c| c.is_ascii_digit());
    }

    fn eat_while(&mut self, keep: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek_char().is_some_and(&keep) {
            self.advance();
        }
        &self.input[start..self.pos]
    }

    /// Error literal, sheet prefix, boolean, cell or name. A word directly
    /// followed by `(` is always a function name, so `LOG10(` and `TRUE(`
    /// are calls.
    fn scan_identifier_or_ref(&mut self) -> Token {
        if self.peek_char() == Some('#') {
            let start = self.pos;
            self.advance();
            self.eat_while(|c| c.is_ascii_alphanumeric() || matches!(c, '!' | '/' | '?'));
            let literal = &self.input[start..self.pos];
            return match CellError::parse(literal) {
                Some(err) => Token::Error(err),
                None => Token::Identifier(literal.to_string()),
            };
        }

        let text = self.eat_while(|c| c.is_alphanumeric() || matches!(c, '_' | '$' | '.' | '\\'));
        match self.peek_char() {
            Some('!') => {
                self.advance();
                Token::SheetRef(text.to_string())
            }
            Some('(') => Token::Identifier(text.to_string()),
            _ if text.eq_ignore_ascii_case("TRUE") => Token::Boolean(true),
            _ if text.eq_ignore_ascii_case("FALSE") => Token::Boolean(false),
            _ if Self::is_cell_reference(text) => Token::CellRef(text.to_string()),
            _ => Token::Identifier(text.to_string()),
        }
    }

    fn is_cell_reference(text: &str) -> bool {
        // [$]A-XFD[$]1-1048576; anything else, like Sales2024, is a name
        let (_, rest) = split_dollar(text);
        let letters = rest.bytes().take_while(|b| b.is_ascii_alphabetic()).count();
        (1..=3).contains(&letters) && CellAddress::parse(text).is_ok()
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn current_token(&self) -> &Token {
        self.current_token.as_ref().unwrap_or(&Token::Eof)
    }

    fn consume(&mut self) -> Token {
        let token = self.current_token.take().unwrap_or(Token::Eof);
        self.advance_token();
        token
    }

    fn expect(&mut self, expected: &Token) -> FormulaResult<()> {
        if self.current_token() == expected {
            self.consume();
            Ok(())
        } else {
            Err(FormulaError::Parse(format!(
                "Expected {:?}, got {:?}",
                expected,
                self.current_token()
            )))
        }
    }

    fn parse_expression(&mut self) -> FormulaResult<FormulaExpr> {
        self.parse_binary(1)
    }

    /// Precedence climbing over [`binary_operator`] levels. `^` groups to
    /// the right, every other operator to the left.
    fn parse_binary(&mut self, min_level: u8) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_unary()?;

        while let Some((op, level)) = binary_operator(self.current_token()) {
            if level < min_level {
                break;
            }
            self.consume();
            let next = if op == BinaryOperator::Power { level } else { level + 1 };
            let right = self.parse_binary(next)?;
            left = FormulaExpr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Prefix `-` and `+` bind tighter than `^`, so `-2^2` is 4
    fn parse_unary(&mut self) -> FormulaResult<FormulaExpr> {
        match self.current_token() {
            Token::Minus => {
                self.consume();
                let operand = self.parse_unary()?;
                return Ok(FormulaExpr::UnaryOp {
                    op: UnaryOperator::Negate,
                    operand: Box::new(operand),
                });
            }
            Token::Plus => {
                self.consume();
                return self.parse_unary();
            }
            _ => {}
        }

        let mut expr = self.parse_range()?;

        while matches!(self.current_token(), Token::Percent) {
            self.consume();
            expr = FormulaExpr::UnaryOp {
                op: UnaryOperator::Percent,
                operand: Box::new(expr),
            };
        }

        Ok(expr)
    }

    fn parse_range(&mut self) -> FormulaResult<FormulaExpr> {
        let left = self.parse_primary()?;

        // Check for range operator (:)
        if matches!(self.current_token(), Token::Colon) {
            self.consume();
            let right = self.parse_primary()?;

            // Two cell references make a range; the second may omit the sheet
            if let (FormulaExpr::CellRef(start), FormulaExpr::CellRef(end)) = (&left, &right) {
                let same_sheet = match (&start.sheet, &end.sheet) {
                    (_, None) => true,
                    (Some(a), Some(b)) => cellgraph_core::sheet_names_equal(a, b),
                    (None, Some(_)) => false,
                };
                if !same_sheet {
                    return Err(FormulaError::Parse(
                        "Range references must be on the same sheet".into(),
                    ));
                }

                return Ok(FormulaExpr::RangeRef(Reference::new(
                    start.sheet.clone(),
                    start.start,
                    end.start,
                )));
            }

            return Ok(FormulaExpr::BinaryOp {
                op: BinaryOperator::Range,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    fn parse_primary(&mut self) -> FormulaResult<FormulaExpr> {
        match self.current_token().clone() {
            Token::Number(n) => {
                self.consume();
                if matches!(self.current_token(), Token::Colon) {
                    if let Some(line) = row_line(&self.number_text(n)) {
                        return self.parse_band(None, BandStart::Row(line));
                    }
                }
                Ok(FormulaExpr::Number(n))
            }

            Token::String(s) => {
                self.consume();
                Ok(FormulaExpr::String(s))
            }

            Token::Boolean(b) => {
                self.consume();
                Ok(FormulaExpr::Boolean(b))
            }

            Token::Error(e) => {
                self.consume();
                Ok(FormulaExpr::Error(e))
            }

            Token::LeftParen => {
                self.consume();
                let expr = self.parse_expression()?;
                self.expect(&Token::RightParen)?;
                Ok(expr)
            }

            Token::LeftBrace => self.parse_array(),

            Token::SheetRef(sheet) => {
                self.consume();
                self.parse_sheet_reference(sheet)
            }

            Token::CellRef(ref_str) => {
                self.consume();
                self.parse_cell_reference(None, &ref_str)
            }

            Token::Identifier(name) => {
                self.consume();
                // Check if it's a function call
                if matches!(self.current_token(), Token::LeftParen) {
                    return self.parse_function_call(name);
                }
                if matches!(self.current_token(), Token::Colon) {
                    if let Some(start) = band_start(&name) {
                        return self.parse_band(None, start);
                    }
                }
                // Named range
                Ok(FormulaExpr::NameRef(name))
            }

            _ => Err(FormulaError::Parse(format!(
                "Unexpected token: {:?}",
                self.current_token()
            ))),
        }
    }

    fn parse_array(&mut self) -> FormulaResult<FormulaExpr> {
        self.expect(&Token::LeftBrace)?;

        let mut rows = Vec::new();
        let mut current_row = Vec::new();

        // Parse first element
        if !matches!(self.current_token(), Token::RightBrace) {
            current_row.push(self.parse_expression()?);

            loop {
                match self.current_token() {
                    Token::Comma => {
                        self.consume();
                        current_row.push(self.parse_expression()?);
                    }
                    Token::Semicolon => {
                        self.consume();
                        rows.push(current_row);
                        current_row = Vec::new();
                        current_row.push(self.parse_expression()?);
                    }
                    Token::RightBrace => break,
                    _ => {
                        return Err(FormulaError::Parse(
                            "Expected ',' ';' or '}' in array".into(),
                        ))
                    }
                }
            }
        }

        if !current_row.is_empty() {
            rows.push(current_row);
        }

        self.expect(&Token::RightBrace)?;
        Ok(FormulaExpr::Array(rows))
    }

    fn parse_function_call(&mut self, name: String) -> FormulaResult<FormulaExpr> {
        self.expect(&Token::LeftParen)?;

        let mut args = Vec::new();

        // Parse arguments
        if !matches!(self.current_token(), Token::RightParen) {
            args.push(self.parse_expression()?);

            while matches!(self.current_token(), Token::Comma) {
                self.consume();
                args.push(self.parse_expression()?);
            }
        }

        self.expect(&Token::RightParen)?;

        Ok(FormulaExpr::Function {
            name: name.to_uppercase(),
            args,
        })
    }

    fn parse_sheet_reference(&mut self, sheet: String) -> FormulaResult<FormulaExpr> {
        // After Sheet1!, we expect a cell reference or the start of a band
        match self.current_token().clone() {
            Token::CellRef(ref_str) => {
                self.consume();
                self.parse_cell_reference(Some(sheet), &ref_str)
            }
            Token::Number(n) => {
                self.consume();
                match row_line(&self.number_text(n)) {
                    Some(line) => self.parse_band(Some(sheet), BandStart::Row(line)),
                    None => Err(FormulaError::Parse(format!("Invalid row number {}", n))),
                }
            }
            Token::Identifier(text) => {
                self.consume();
                match band_start(&text) {
                    Some(start) => self.parse_band(Some(sheet), start),
                    None => Err(FormulaError::Parse(format!(
                        "Expected reference after sheet name, got '{}'",
                        text
                    ))),
                }
            }
            _ => Err(FormulaError::Parse(
                "Expected cell reference after sheet name".into(),
            )),
        }
    }

    fn parse_cell_reference(
        &mut self,
        sheet: Option<String>,
        ref_str: &str,
    ) -> FormulaResult<FormulaExpr> {
        let address = CellAddress::parse(ref_str).map_err(|e| {
            FormulaError::Parse(format!("Invalid cell reference '{}': {}", ref_str, e))
        })?;

        Ok(FormulaExpr::CellRef(Reference::new(sheet, address, address)))
    }

    /// Parse the `:end` half of `3:5` or `C:E`; the start has been consumed
    fn parse_band(&mut self, sheet: Option<String>, start: BandStart) -> FormulaResult<FormulaExpr> {
        self.expect(&Token::Colon)?;
        let end_text = match self.current_token().clone() {
            Token::Number(n) => self.number_text(n),
            Token::Identifier(text) => text,
            other => {
                return Err(FormulaError::Parse(format!(
                    "Expected end of band, got {:?}",
                    other
                )))
            }
        };
        self.consume();

        let invalid = || FormulaError::Parse(format!("Invalid band end '{}'", end_text));
        let (first, last) = match (start, band_start(&end_text).ok_or_else(invalid)?) {
            (BandStart::Row((a, a_abs)), BandStart::Row((b, b_abs))) => (
                CellAddress::with_absolute(a, 1, a_abs, false),
                CellAddress::with_absolute(b, MAX_COLS, b_abs, false),
            ),
            (BandStart::Column((a, a_abs)), BandStart::Column((b, b_abs))) => (
                CellAddress::with_absolute(1, a, false, a_abs),
                CellAddress::with_absolute(MAX_ROWS, b, false, b_abs),
            ),
            _ => return Err(invalid()),
        };

        Ok(FormulaExpr::RangeRef(Reference::new(sheet, first, last)))
    }

    fn number_text(&self, n: f64) -> String {
        if n.fract() == 0.0 && n >= 0.0 {
            format!("{}", n as u64)
        } else {
            n.to_string()
        }
    }
}

fn punctuation(c: char) -> Option<Token> {
    Some(match c {
        '+' => Token::Plus,
        '-' => Token::Minus,
        '*' => Token::Star,
        '/' => Token::Slash,
        '^' => Token::Caret,
        '%' => Token::Percent,
        '&' => Token::Ampersand,
        '=' => Token::Equal,
        ':' => Token::Colon,
        ',' => Token::Comma,
        ';' => Token::Semicolon,
        '(' => Token::LeftParen,
        ')' => Token::RightParen,
        '{' => Token::LeftBrace,
        '}' => Token::RightBrace,
        _ => return None,
    })
}

/// Infix operator and its binding level, loosest first
fn binary_operator(token: &Token) -> Option<(BinaryOperator, u8)> {
    let entry = match token {
        Token::Equal => (BinaryOperator::Equal, 1),
        Token::NotEqual => (BinaryOperator::NotEqual, 1),
        Token::LessThan => (BinaryOperator::LessThan, 1),
        Token::LessEqual => (BinaryOperator::LessEqual, 1),
        Token::GreaterThan => (BinaryOperator::GreaterThan, 1),
        Token::GreaterEqual => (BinaryOperator::GreaterEqual, 1),
        Token::Ampersand => (BinaryOperator::Concat, 2),
        Token::Plus => (BinaryOperator::Add, 3),
        Token::Minus => (BinaryOperator::Subtract, 3),
        Token::Star => (BinaryOperator::Multiply, 4),
        Token::Slash => (BinaryOperator::Divide, 4),
        Token::Caret => (BinaryOperator::Power, 5),
        _ => return None,
    };
    Some(entry)
}

/// One end of a whole-row or whole-column band
#[derive(Debug, Clone, Copy)]
enum BandStart {
    Row((u32, bool)),
    Column((u16, bool)),
}

fn split_dollar(text: &str) -> (bool, &str) {
    match text.strip_prefix('$') {
        Some(rest) => (true, rest),
        None => (false, text),
    }
}

/// `3` or `$3`
fn row_line(text: &str) -> Option<(u32, bool)> {
    let (absolute, digits) = split_dollar(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let row: u32 = digits.parse().ok()?;
    (1..=MAX_ROWS).contains(&row).then_some((row, absolute))
}

/// `3`, `$3`, `C` or `$C`
fn band_start(text: &str) -> Option<BandStart> {
    if let Some(line) = row_line(text) {
        return Some(BandStart::Row(line));
    }
    let (absolute, letters) = split_dollar(text);
    if letters.is_empty() || !letters.bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    let col = CellAddress::letters_to_column(letters).ok()?;
    Some(BandStart::Column((col, absolute)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bin(op: BinaryOperator, left: FormulaExpr, right: FormulaExpr) -> FormulaExpr {
        FormulaExpr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn cell(row: u32, col: u16) -> FormulaExpr {
        let at = CellAddress::new(row, col);
        FormulaExpr::CellRef(Reference::new(None, at, at))
    }

    #[test]
    fn test_literals() {
        for (text, expected) in [
            ("=42", FormulaExpr::Number(42.0)),
            ("=3.14", FormulaExpr::Number(3.14)),
            ("=.5", FormulaExpr::Number(0.5)),
            ("=1e10", FormulaExpr::Number(1e10)),
            ("=\"Hello\"", FormulaExpr::String("Hello".into())),
            ("=\"say \"\"hi\"\"\"", FormulaExpr::String("say \"hi\"".into())),
            ("=true", FormulaExpr::Boolean(true)),
            ("=FALSE", FormulaExpr::Boolean(false)),
            ("=#VALUE!", FormulaExpr::Error(CellError::Value)),
            ("=#DIV/0!", FormulaExpr::Error(CellError::Div0)),
        ] {
            assert_eq!(parse_formula(text).unwrap(), expected, "{text}");
        }
    }

    #[test]
    fn test_expressions() {
        assert_eq!(
            parse_formula("=1+2*3").unwrap(),
            bin(
                BinaryOperator::Add,
                FormulaExpr::Number(1.0),
                bin(BinaryOperator::Multiply, FormulaExpr::Number(2.0), FormulaExpr::Number(3.0))
            )
        );
        assert_eq!(
            parse_formula("=(A1+B1)*3").unwrap(),
            bin(
                BinaryOperator::Multiply,
                bin(BinaryOperator::Add, cell(1, 1), cell(1, 2)),
                FormulaExpr::Number(3.0)
            )
        );
        assert_eq!(
            parse_formula("=A1<>B1").unwrap(),
            bin(BinaryOperator::NotEqual, cell(1, 1), cell(1, 2))
        );
        assert_eq!(
            parse_formula("=\"a\"&B2").unwrap(),
            bin(BinaryOperator::Concat, FormulaExpr::String("a".into()), cell(2, 2))
        );
        assert_eq!(
            parse_formula("=50%").unwrap(),
            FormulaExpr::UnaryOp {
                op: UnaryOperator::Percent,
                operand: Box::new(FormulaExpr::Number(50.0)),
            }
        );
    }

    #[test]
    fn test_cells_and_ranges() {
        assert_eq!(parse_formula("=A1").unwrap(), cell(1, 1));
        let FormulaExpr::CellRef(absolute) = parse_formula("=$B$2").unwrap() else {
            panic!("expected a cell");
        };
        assert_eq!(absolute.start, CellAddress::absolute(2, 2));

        let FormulaExpr::RangeRef(range) = parse_formula("=A1:B10").unwrap() else {
            panic!("expected a range");
        };
        assert_eq!(range.extent(cellgraph_core::Axis::Row), (1, 10));
        assert_eq!(range.extent(cellgraph_core::Axis::Column), (1, 2));
    }

    #[test]
    fn test_calls_and_arrays() {
        let FormulaExpr::Function { name, args } =
            parse_formula("=if(A1>0,SUM(B1:B10),0)").unwrap()
        else {
            panic!("expected a call");
        };
        assert_eq!(name, "IF");
        assert_eq!(args.len(), 3);
        assert!(matches!(&args[1], FormulaExpr::Function { name, .. } if name == "SUM"));

        assert_eq!(
            parse_formula("=NOW()").unwrap(),
            FormulaExpr::Function {
                name: "NOW".into(),
                args: vec![],
            }
        );

        let FormulaExpr::Array(rows) = parse_formula("={1,2;3,4}").unwrap() else {
            panic!("expected an array");
        };
        assert_eq!(rows.iter().map(Vec::len).collect::<Vec<_>>(), vec![2, 2]);
    }

    #[test]
    fn test_operator_binding() {
        let n = FormulaExpr::Number;

        // Subtraction groups left, powers group right
        assert_eq!(
            parse_formula("=1-2-3").unwrap(),
            bin(BinaryOperator::Subtract, bin(BinaryOperator::Subtract, n(1.0), n(2.0)), n(3.0))
        );
        assert_eq!(
            parse_formula("=2^3^2").unwrap(),
            bin(BinaryOperator::Power, n(2.0), bin(BinaryOperator::Power, n(3.0), n(2.0)))
        );

        let negated = FormulaExpr::UnaryOp {
            op: UnaryOperator::Negate,
            operand: Box::new(n(2.0)),
        };
        assert_eq!(
            parse_formula("=-2^2").unwrap(),
            bin(BinaryOperator::Power, negated, n(2.0))
        );

        assert!(matches!(
            parse_formula("=1&2=\"12\"").unwrap(),
            FormulaExpr::BinaryOp { op: BinaryOperator::Equal, .. }
        ));
        assert!(matches!(
            parse_formula("=1<=2").unwrap(),
            FormulaExpr::BinaryOp { op: BinaryOperator::LessEqual, .. }
        ));
    }

    #[test]
    fn test_parse_without_equals() {
        assert_eq!(parse_formula("42").unwrap(), FormulaExpr::Number(42.0));
        assert_eq!(parse_formula("A1+1").unwrap(), parse_formula("=A1+1").unwrap());
        assert!(parse_formula("=").is_err());
        assert!(parse_formula("  ").is_err());
    }

    #[test]
    fn test_parse_sheet_references() {
        let ast = parse_formula("=Fin_CMHP1!F29").unwrap();
        assert_eq!(
            ast,
            FormulaExpr::CellRef(Reference::new(
                Some("Fin_CMHP1".into()),
                CellAddress::new(29, 6),
                CellAddress::new(29, 6)
            ))
        );

        let ast = parse_formula("='Bob''s data'!A1:B2").unwrap();
        if let FormulaExpr::RangeRef(range_ref) = ast {
            assert_eq!(range_ref.sheet.as_deref(), Some("Bob's data"));
            assert_eq!((range_ref.end.row, range_ref.end.col), (2, 2));
        } else {
            panic!("Expected RangeRef");
        }

        // Right corner inherits the left corner's sheet
        let ast = parse_formula("=Data!A1:Data!C3").unwrap();
        assert!(matches!(ast, FormulaExpr::RangeRef(ref r) if r.sheet.as_deref() == Some("Data")));

        assert!(parse_formula("=Data!A1:Other!C3").is_err());
        assert!(parse_formula("='unterminated!A1").is_err());
    }

    #[test]
    fn test_parse_bands() {
        let ast = parse_formula("=SUM(3:5)").unwrap();
        let FormulaExpr::Function { args, .. } = ast else {
            panic!("Expected Function");
        };
        let FormulaExpr::RangeRef(band) = &args[0] else {
            panic!("Expected RangeRef");
        };
        assert_eq!(band.extent(cellgraph_core::Axis::Row), (3, 5));
        assert_eq!(band.kind(), cellgraph_core::ReferenceKind::RowBand);

        let ast = parse_formula("=Sheet2!$C:E").unwrap();
        let FormulaExpr::RangeRef(band) = ast else {
            panic!("Expected RangeRef");
        };
        assert_eq!(band.sheet.as_deref(), Some("Sheet2"));
        assert_eq!(band.extent(cellgraph_core::Axis::Column), (3, 5));
        assert!(band.start.col_absolute);
        assert!(!band.end.col_absolute);

        assert!(parse_formula("=3:C").is_err());
    }

    #[test]
    fn test_names_and_functions_that_look_like_cells() {
        assert_eq!(
            parse_formula("=Sales2024").unwrap(),
            FormulaExpr::NameRef("Sales2024".into())
        );
        assert!(matches!(
            parse_formula("=LOG10(100)").unwrap(),
            FormulaExpr::Function { ref name, .. } if name == "LOG10"
        ));
        assert_eq!(
            parse_formula("=Tax_Rate").unwrap(),
            FormulaExpr::NameRef("Tax_Rate".into())
        );
    }

    #[test]
    fn test_invalid_characters() {
        assert!(parse_formula("=1 @ 2").is_err());
        assert!(parse_formula("=A1+").is_err());
        assert!(parse_formula("=(1+2").is_err());
    }
}
