//! Formula text → postfix stack.
//!
//! Macro sheets saved in the XML formats keep formulas as text rather than
//! as token streams. This parser turns that text into the same postfix
//! [`StackItem`] sequence the binary token stream would have produced, so
//! rendering and evaluation never care where a formula came from.
//!
//! Precedence (loosest first): comparison, `&`, `+ -`, `* /`, `^`, unary
//! minus. Binary operators associate left.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};
use xlmulator_common::{CellCoord, XlmError};

use crate::stack_item::{CellRef, Operator, StackItem};
use crate::tokenizer::{Associativity, Token, TokenType, Tokenizer};

/// Deepest parenthesis / call nesting accepted from formula text.
pub const MAX_NESTING: usize = 256;

static R1C1_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^R(\[-?\d+\]|\d+)?C(\[-?\d+\]|\d+)?$").expect("valid R1C1 regex")
});

/// Parse formula text (leading `=` optional) into a postfix stack.
pub fn parse_formula(text: &str) -> Result<Vec<StackItem>, XlmError> {
    let tokenizer = Tokenizer::new(text)?;
    let mut parser = Parser {
        tokens: &tokenizer.items,
        pos: 0,
        depth: 0,
        out: Vec::with_capacity(tokenizer.items.len()),
    };
    if parser.tokens.is_empty() {
        return Ok(Vec::new());
    }
    parser.parse_expr(1)?;
    if let Some(extra) = parser.peek() {
        return Err(XlmError::parse(
            format!("unexpected {} `{}`", extra.token_type, extra.value),
            extra.start,
        ));
    }
    Ok(parser.out)
}

/// Like [`parse_formula`], but text that does not parse becomes a single
/// string literal holding the original text.
pub fn parse_formula_lenient(text: &str) -> Vec<StackItem> {
    match parse_formula(text) {
        Ok(stack) => stack,
        Err(e) => {
            warn!(category = "parse", formula = %text, error = %e, "keeping formula as text");
            vec![StackItem::StringLiteral(text.to_string())]
        }
    }
}

/// Parse a single cell reference: `A1`, `$EC$210`, `R3C4` (absolute) or
/// `R[-1]C[2]` / `RC[1]` (relative). Any `Sheet!` prefix is ignored.
/// R1C1 references that mix absolute and relative parts are rejected.
pub fn parse_reference(text: &str) -> Result<CellRef, XlmError> {
    let body = text.rsplit('!').next().unwrap_or(text).trim();
    let stripped = body.replace('$', "");

    let mut r1c1_error = None;
    if let Some(caps) = R1C1_RE.captures(&stripped) {
        let row = caps.get(1).map(|m| m.as_str());
        let col = caps.get(2).map(|m| m.as_str());
        match (r1c1_part(row), r1c1_part(col)) {
            (Some(R1c1::Abs(r)), Some(R1c1::Abs(c))) => {
                return CellCoord::new(r, c)
                    .map(CellRef::absolute)
                    .ok_or_else(|| XlmError::InvalidReference(text.to_string()));
            }
            (Some(R1c1::Rel(r)), Some(R1c1::Rel(c))) => return Ok(CellRef::relative(r, c)),
            (Some(_), Some(_)) => {
                r1c1_error = Some(XlmError::InvalidReference(format!(
                    "{text} (mixed absolute/relative R1C1 references are not supported)"
                )));
            }
            _ => {
                r1c1_error = Some(XlmError::InvalidReference(text.to_string()));
            }
        }
    }

    // Column names such as `RC` are valid A1 letters too.
    if let Some(coord) = CellCoord::from_a1(body) {
        return Ok(CellRef::absolute(coord));
    }
    Err(r1c1_error.unwrap_or_else(|| XlmError::InvalidReference(text.to_string())))
}

enum R1c1 {
    Abs(u32),
    Rel(i64),
}

fn r1c1_part(part: Option<&str>) -> Option<R1c1> {
    match part {
        None => Some(R1c1::Rel(0)),
        Some(p) if p.starts_with('[') => p
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<i64>()
            .ok()
            .map(R1c1::Rel),
        Some(p) => p.parse::<u32>().ok().map(R1c1::Abs),
    }
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
    out: Vec<StackItem>,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<&'t Token, XlmError> {
        let tok = self.tokens.get(self.pos).ok_or_else(|| {
            let end = self.tokens.last().map_or(0, |t| t.end);
            XlmError::parse("unexpected end of formula", end)
        })?;
        self.pos += 1;
        Ok(tok)
    }

    fn enter(&mut self, at: usize) -> Result<(), XlmError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(XlmError::parse("formula nesting too deep", at));
        }
        Ok(())
    }

    /// Precedence climbing: parse an operand, then fold in every infix
    /// operator that binds at least as tightly as `min_prec`.
    fn parse_expr(&mut self, min_prec: u8) -> Result<(), XlmError> {
        self.parse_unary()?;
        while let Some(tok) = self.peek() {
            if tok.token_type != TokenType::OpInfix {
                break;
            }
            let Some((prec, assoc)) = tok.get_precedence() else {
                return Err(XlmError::parse(format!("unknown operator `{}`", tok.value), tok.start));
            };
            if prec < min_prec {
                break;
            }
            let op = Operator::from_symbol(&tok.value)
                .ok_or_else(|| XlmError::parse(format!("unknown operator `{}`", tok.value), tok.start))?;
            self.pos += 1;
            self.enter(tok.start)?;
            let next_min = match assoc {
                Associativity::Left => prec + 1,
                Associativity::Right => prec,
            };
            self.parse_expr(next_min)?;
            self.depth -= 1;
            self.out.push(StackItem::Operator(op));
        }
        Ok(())
    }

    fn parse_unary(&mut self) -> Result<(), XlmError> {
        let Some(tok) = self.peek() else {
            return Err(XlmError::parse("expected an operand", self.tokens.last().map_or(0, |t| t.end)));
        };
        if tok.token_type != TokenType::OpPrefix {
            return self.parse_primary();
        }
        self.pos += 1;
        self.enter(tok.start)?;
        if tok.value == "-" {
            // Fold `-<number>` into a negative literal.
            match self.peek() {
                Some(num) if num.token_type == TokenType::Number => {
                    self.pos += 1;
                    self.out.push(number_literal(num, true)?);
                }
                _ => {
                    self.parse_unary()?;
                    self.out.push(StackItem::Negate);
                }
            }
        } else {
            self.parse_unary()?;
        }
        self.depth -= 1;
        Ok(())
    }

    fn parse_primary(&mut self) -> Result<(), XlmError> {
        let tok = self.next()?;
        match tok.token_type {
            TokenType::Number => {
                let item = number_literal(tok, false)?;
                self.out.push(item);
            }
            TokenType::Text => self.out.push(StackItem::StringLiteral(tok.value.clone())),
            TokenType::Logical => self
                .out
                .push(StackItem::BoolLiteral(tok.value.eq_ignore_ascii_case("TRUE"))),
            TokenType::Reference => {
                let r = parse_reference(&tok.value)?;
                self.out.push(StackItem::CellRef(r));
            }
            TokenType::Name => {
                debug!(name = %tok.value, "defined name kept unresolved");
                self.out.push(StackItem::Unparsed(tok.value.clone()));
            }
            TokenType::Func => self.parse_call(tok)?,
            TokenType::Open => {
                self.enter(tok.start)?;
                self.parse_expr(1)?;
                self.depth -= 1;
                let close = self.next()?;
                if close.token_type != TokenType::Close {
                    return Err(XlmError::parse(
                        format!("expected `)`, found `{}`", close.value),
                        close.start,
                    ));
                }
            }
            TokenType::Close | TokenType::Sep | TokenType::OpInfix | TokenType::OpPrefix => {
                return Err(XlmError::parse(
                    format!("unexpected `{}`", tok.value),
                    tok.start,
                ));
            }
        }
        Ok(())
    }

    fn parse_call(&mut self, func: &'t Token) -> Result<(), XlmError> {
        self.enter(func.start)?;
        let mut argc: usize = 0;

        if self
            .peek()
            .is_some_and(|t| t.token_type == TokenType::Close)
        {
            self.pos += 1;
        } else {
            loop {
                match self.peek().map(|t| t.token_type) {
                    Some(TokenType::Sep) | Some(TokenType::Close) => {
                        self.out.push(StackItem::MissingArg)
                    }
                    _ => self.parse_expr(1)?,
                }
                argc += 1;
                let sep = self.next()?;
                match sep.token_type {
                    TokenType::Sep => continue,
                    TokenType::Close => break,
                    _ => {
                        return Err(XlmError::parse(
                            format!("expected `,` or `)` in call to {}, found `{}`", func.value, sep.value),
                            sep.start,
                        ));
                    }
                }
            }
        }

        let arity = u8::try_from(argc)
            .map_err(|_| XlmError::parse(format!("too many arguments to {}", func.value), func.start))?;
        self.depth -= 1;
        self.out.push(StackItem::variadic_call(&func.value, arity));
        Ok(())
    }
}

fn number_literal(tok: &Token, negate: bool) -> Result<StackItem, XlmError> {
    let text = tok.value.as_str();
    let is_integer = text.bytes().all(|b| b.is_ascii_digit());
    if is_integer {
        if let Ok(i) = text.parse::<i64>() {
            return Ok(StackItem::IntLiteral(if negate { -i } else { i }));
        }
    }
    let f = text
        .parse::<f64>()
        .map_err(|_| XlmError::parse(format!("invalid number `{text}`"), tok.start))?;
    Ok(StackItem::FloatLiteral(if negate { -f } else { f }))
}
