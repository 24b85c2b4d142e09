use std::convert::TryFrom;
use std::error::Error;
use std::fmt::{self, Display};

use xlmulator_common::XlmError;

/// Represents operator associativity.
#[derive(Debug, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
}

/// A custom error type for the tokenizer.
#[derive(Debug)]
pub struct TokenizerError {
    pub message: String,
    pub pos: usize,
}

impl fmt::Display for TokenizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenizerError: {}", self.message)
    }
}

impl Error for TokenizerError {}

impl From<TokenizerError> for XlmError {
    fn from(e: TokenizerError) -> Self {
        XlmError::Parse {
            message: e.message,
            pos: e.pos,
        }
    }
}

/// The type of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    /// String constant; `value` holds the unescaped contents.
    Text,
    Number,
    Logical,
    /// A1 or R1C1 cell reference, sheet prefix stripped.
    Reference,
    /// Identifier that is neither a reference nor a function call.
    Name,
    /// Function name; the opening parenthesis is part of the token.
    Func,
    OpPrefix,
    OpInfix,
    Open,
    Close,
    Sep,
}

impl Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A token in an XLM formula.
#[derive(Debug, Clone, PartialEq, Hash)]
pub struct Token {
    pub value: String,
    pub token_type: TokenType,
    pub start: usize,
    pub end: usize,
}

impl Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} value: {}>", self.token_type, self.value)
    }
}

impl Token {
    pub fn new(value: String, token_type: TokenType, start: usize, end: usize) -> Self {
        Token {
            value,
            token_type,
            start,
            end,
        }
    }

    pub fn is_operator(&self) -> bool {
        matches!(self.token_type, TokenType::OpPrefix | TokenType::OpInfix)
    }

    pub fn get_precedence(&self) -> Option<(u8, Associativity)> {
        if self.token_type == TokenType::OpPrefix {
            return Some((6, Associativity::Right));
        }
        if self.token_type != TokenType::OpInfix {
            return None;
        }
        match self.value.as_str() {
            "^" => Some((5, Associativity::Left)),
            "*" | "/" => Some((4, Associativity::Left)),
            "+" | "-" => Some((3, Associativity::Left)),
            "&" => Some((2, Associativity::Left)),
            "=" | "<" | ">" | "<=" | ">=" | "<>" => Some((1, Associativity::Left)),
            _ => None,
        }
    }

    /// True when a following `+`/`-` must be read as a prefix operator.
    fn expects_operand(prev: Option<&Token>) -> bool {
        match prev {
            None => true,
            Some(t) => matches!(
                t.token_type,
                TokenType::OpPrefix
                    | TokenType::OpInfix
                    | TokenType::Open
                    | TokenType::Func
                    | TokenType::Sep
            ),
        }
    }
}

/// A tokenizer for XLM formula text.
#[derive(Debug)]
pub struct Tokenizer {
    formula: String,
    pub items: Vec<Token>,
    offset: usize,
}

impl Tokenizer {
    /// Tokenize a formula. A leading `=` is skipped.
    pub fn new(formula: &str) -> Result<Self, TokenizerError> {
        let mut tokenizer = Tokenizer {
            formula: formula.to_string(),
            items: Vec::with_capacity(formula.len() / 2),
            offset: 0,
        };
        tokenizer.parse()?;
        Ok(tokenizer)
    }

    pub fn formula(&self) -> &str {
        &self.formula
    }

    fn byte(&self, at: usize) -> Option<u8> {
        self.formula.as_bytes().get(at).copied()
    }

    fn parse(&mut self) -> Result<(), TokenizerError> {
        self.skip_whitespace();
        if self.byte(self.offset) == Some(b'=') {
            self.offset += 1;
        }

        while let Some(b) = self.byte(self.offset) {
            match b {
                b' ' | b'\t' | b'\r' | b'\n' => self.skip_whitespace(),
                b'"' => self.parse_string()?,
                b'\'' => self.parse_quoted_sheet()?,
                b'0'..=b'9' => self.parse_number()?,
                b'.' if self.byte(self.offset + 1).is_some_and(|d| d.is_ascii_digit()) => {
                    self.parse_number()?
                }
                b'(' => self.push_single(TokenType::Open),
                b')' => self.push_single(TokenType::Close),
                b',' | b';' => self.push_single(TokenType::Sep),
                b'+' | b'-' => {
                    let ty = if Token::expects_operand(self.items.last()) {
                        TokenType::OpPrefix
                    } else {
                        TokenType::OpInfix
                    };
                    self.push_single(ty);
                }
                b'*' | b'/' | b'^' | b'&' | b'=' => self.push_single(TokenType::OpInfix),
                b'<' | b'>' => self.parse_comparison(),
                b'!' if self.byte(self.offset + 1) == Some(b'=') => {
                    let start = self.offset;
                    self.items
                        .push(Token::new("<>".into(), TokenType::OpInfix, start, start + 2));
                    self.offset += 2;
                }
                c if c.is_ascii_alphabetic() || c == b'_' || c == b'$' || c == b'\\' => {
                    self.parse_word()?
                }
                _ => {
                    let ch = self.formula[self.offset..].chars().next().unwrap_or('?');
                    return Err(TokenizerError {
                        message: format!("Unexpected character {ch:?} at position {}", self.offset),
                        pos: self.offset,
                    });
                }
            }
        }
        Ok(())
    }

    fn skip_whitespace(&mut self) {
        while self
            .byte(self.offset)
            .is_some_and(|b| b.is_ascii_whitespace())
        {
            self.offset += 1;
        }
    }

    fn push_single(&mut self, token_type: TokenType) {
        let start = self.offset;
        self.items.push(Token::new(
            self.formula[start..start + 1].to_string(),
            token_type,
            start,
            start + 1,
        ));
        self.offset += 1;
    }

    fn parse_comparison(&mut self) {
        let start = self.offset;
        let len = match (self.byte(start), self.byte(start + 1)) {
            (Some(b'<'), Some(b'=' | b'>')) | (Some(b'>'), Some(b'=')) => 2,
            _ => 1,
        };
        self.items.push(Token::new(
            self.formula[start..start + len].to_string(),
            TokenType::OpInfix,
            start,
            start + len,
        ));
        self.offset += len;
    }

    /// Parse a string literal. `""` inside the literal is an escaped quote.
    fn parse_string(&mut self) -> Result<(), TokenizerError> {
        let start = self.offset;
        let mut value = String::new();
        let mut pos = start + 1;
        loop {
            let Some(rel) = self.formula[pos..].find('"') else {
                return Err(TokenizerError {
                    message: format!("Reached end of formula while parsing string starting at {start}"),
                    pos: start,
                });
            };
            value.push_str(&self.formula[pos..pos + rel]);
            pos += rel + 1;
            if self.byte(pos) == Some(b'"') {
                value.push('"');
                pos += 1;
            } else {
                break;
            }
        }
        self.items
            .push(Token::new(value, TokenType::Text, start, pos));
        self.offset = pos;
        Ok(())
    }

    /// `'Sheet name'!` prefixes carry no information for a single sheet.
    fn parse_quoted_sheet(&mut self) -> Result<(), TokenizerError> {
        let start = self.offset;
        let mut pos = start + 1;
        loop {
            let Some(rel) = self.formula[pos..].find('\'') else {
                return Err(TokenizerError {
                    message: format!("Unterminated sheet name starting at {start}"),
                    pos: start,
                });
            };
            pos += rel + 1;
            if self.byte(pos) == Some(b'\'') {
                pos += 1;
            } else {
                break;
            }
        }
        if self.byte(pos) != Some(b'!') {
            return Err(TokenizerError {
                message: format!("Quoted name at {start} is not a sheet prefix"),
                pos: start,
            });
        }
        self.offset = pos + 1;
        Ok(())
    }

    fn parse_number(&mut self) -> Result<(), TokenizerError> {
        let start = self.offset;
        let digits = |tok: &Self, mut p: usize| {
            while tok.byte(p).is_some_and(|b| b.is_ascii_digit()) {
                p += 1;
            }
            p
        };
        let mut pos = digits(self, start);
        if self.byte(pos) == Some(b'.') {
            pos = digits(self, pos + 1);
        }
        if matches!(self.byte(pos), Some(b'e' | b'E')) {
            let mut exp = pos + 1;
            if matches!(self.byte(exp), Some(b'+' | b'-')) {
                exp += 1;
            }
            let after = digits(self, exp);
            if after == exp {
                return Err(TokenizerError {
                    message: format!("Malformed exponent in number at position {start}"),
                    pos: start,
                });
            }
            pos = after;
        }
        self.items.push(Token::new(
            self.formula[start..pos].to_string(),
            TokenType::Number,
            start,
            pos,
        ));
        self.offset = pos;
        Ok(())
    }

    /// Identifiers: function names, references, booleans and defined names.
    fn parse_word(&mut self) -> Result<(), TokenizerError> {
        let start = self.offset;
        let mut pos = start;
        while let Some(b) = self.byte(pos) {
            if b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'$' | b'\\') {
                pos += 1;
            } else if b == b'[' {
                // R[-1]C[2]
                let Some(rel) = self.formula[pos..].find(']') else {
                    return Err(TokenizerError {
                        message: format!("Unterminated '[' at position {pos}"),
                        pos,
                    });
                };
                pos += rel + 1;
            } else {
                break;
            }
        }

        if self.byte(pos) == Some(b'!') && self.byte(pos + 1) != Some(b'=') {
            // Unquoted sheet prefix.
            self.offset = pos + 1;
            return Ok(());
        }

        let word = &self.formula[start..pos];
        let mut look = pos;
        while self.byte(look).is_some_and(|b| b == b' ') {
            look += 1;
        }
        if self.byte(look) == Some(b'(') {
            self.items.push(Token::new(
                word.to_ascii_uppercase(),
                TokenType::Func,
                start,
                look + 1,
            ));
            self.offset = look + 1;
            return Ok(());
        }

        let token_type = if word.eq_ignore_ascii_case("TRUE") || word.eq_ignore_ascii_case("FALSE") {
            TokenType::Logical
        } else if crate::parser::parse_reference(word).is_ok() {
            TokenType::Reference
        } else {
            TokenType::Name
        };
        self.items
            .push(Token::new(word.to_string(), token_type, start, pos));
        self.offset = pos;
        Ok(())
    }
}

impl TryFrom<&str> for Tokenizer {
    type Error = TokenizerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Tokenizer::new(value)
    }
}
