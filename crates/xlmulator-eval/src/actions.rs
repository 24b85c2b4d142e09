//! The action-tag protocol.
//!
//! Functions with externally observable effects return a tag string instead
//! of performing the effect:
//!
//! ```text
//! ACTION: CALL(['urlmon.dll', 'URLDownloadToFileA', 'JJCCJJ', 0, 'http://x'])
//! ACTION: HALT
//! ACTION: CLOSE
//! ACTION: FILE:FOPEN(C:\x.vbs, 3)
//! ACTION: OUTPUT:ALERT(done, 2)
//! ACTION: INPUT:INPUT(name?)
//! ACTION: EXEC: cmd.exe /c calc, 1
//! ```
//!
//! Once a pass has finished, [`extract_actions`] scans the resolved formula
//! cells and turns every tag back into an [`Action`] record. The CALL payload
//! is a Python-style list literal; it is parsed back with a small literal
//! reader rather than by pattern matching so embedded quotes, commas and
//! escapes survive.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use xlmulator_common::{Value, py_list_repr};

use crate::builtins::utils::join_display;
use crate::sheet::Sheet;

pub const ACTION_PREFIX: &str = "ACTION: ";

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Call,
    Halt,
    File,
    Output,
    Input,
    Exec,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Call => "CALL",
            ActionKind::Halt => "HALT",
            ActionKind::File => "FILE",
            ActionKind::Output => "OUTPUT",
            ActionKind::Input => "INPUT",
            ActionKind::Exec => "EXEC",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One externally observable effect the macro would have performed.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub kind: ActionKind,
    pub detail: String,
    pub note: Option<String>,
}

impl Action {
    pub fn new<S: Into<String>>(kind: ActionKind, detail: S) -> Self {
        Self {
            kind,
            detail: detail.into(),
            note: None,
        }
    }

    pub fn with_note<S: Into<String>>(mut self, note: S) -> Self {
        self.note = Some(note.into());
        self
    }

    /// `(kind, detail, note)` with an empty note when there is none.
    pub fn as_tuple(&self) -> (&str, &str, &str) {
        (
            self.kind.as_str(),
            &self.detail,
            self.note.as_deref().unwrap_or(""),
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (kind, detail, note) = self.as_tuple();
        write!(f, "{kind}\t{detail}\t{note}")
    }
}

/* ─────────────────────────── tag builders ─────────────────────────── */

pub fn call_tag(args: &[Value]) -> String {
    format!("{ACTION_PREFIX}CALL({})", py_list_repr(args))
}

pub fn exec_tag(args: &[Value]) -> String {
    format!("{ACTION_PREFIX}EXEC: {}", join_display(args))
}

/// `ACTION: HALT` or `ACTION: CLOSE`.
pub fn halt_tag(name: &str) -> String {
    format!("{ACTION_PREFIX}{name}")
}

/// `ACTION: <KIND>:<FUNC>(<args>)` for the file, output and input kinds.
pub fn tagged_call(kind: ActionKind, function: &str, args: &[Value]) -> String {
    format!(
        "{ACTION_PREFIX}{}:{function}({})",
        kind.as_str(),
        join_display(args)
    )
}

/* ──────────────────────────── extraction ──────────────────────────── */

/// Parse one resolved cell value. Values that are not action tags yield
/// `None`.
pub fn extract_action(value: &str) -> Option<Action> {
    let body = value.strip_prefix(ACTION_PREFIX)?;

    if body == "HALT" || body == "CLOSE" {
        return Some(Action::new(ActionKind::Halt, body));
    }
    if let Some(payload) = body
        .strip_prefix("CALL(")
        .and_then(|p| p.strip_suffix(')'))
    {
        return Some(call_action(payload));
    }
    if let Some(args) = body.strip_prefix("EXEC: ") {
        return Some(Action::new(ActionKind::Exec, args));
    }
    for kind in [ActionKind::File, ActionKind::Output, ActionKind::Input] {
        if let Some(detail) = body
            .strip_prefix(kind.as_str())
            .and_then(|rest| rest.strip_prefix(':'))
        {
            return Some(Action::new(kind, detail));
        }
    }

    debug!(tag = %value, "unrecognized action tag");
    None
}

fn call_action(payload: &str) -> Action {
    let items = match parse_py_list(payload) {
        Ok(items) if items.len() >= 2 => items,
        Ok(_) | Err(_) => {
            warn!(category = "conversion", payload = %payload, "malformed CALL payload");
            return Action::new(ActionKind::Call, payload);
        }
    };
    // items[2] is the argument type string; it says nothing about behaviour.
    let args: Vec<&str> = items.iter().skip(3).map(String::as_str).collect();
    Action::new(
        ActionKind::Call,
        format!("{}({})", items[1], args.join(", ")),
    )
    .with_note(format!("From DLL '{}'", items[0]))
}

/// Scan formula cells in ascending order and collect every action tag
/// among their resolved values. Never mutates the sheet.
pub fn extract_actions(sheet: &Sheet) -> Vec<Action> {
    sheet
        .formula_cells()
        .filter_map(|coord| sheet.value(coord))
        .filter_map(Value::as_text)
        .filter_map(extract_action)
        .collect()
}

/* ──────────────────────── python list literals ────────────────────── */

/// Read a Python list literal of scalars and return each element as Python's
/// `str()` would show it: strings unquoted and unescaped, everything else
/// verbatim.
pub fn parse_py_list(text: &str) -> Result<Vec<String>, String> {
    let mut reader = PyLiteralReader {
        chars: text.trim().chars().collect(),
        pos: 0,
    };
    reader.expect('[')?;
    let mut items = Vec::new();
    reader.skip_ws();
    if reader.eat(']') {
        return reader.finish(items);
    }
    loop {
        reader.skip_ws();
        items.push(reader.item()?);
        reader.skip_ws();
        if reader.eat(',') {
            continue;
        }
        reader.expect(']')?;
        return reader.finish(items);
    }
}

struct PyLiteralReader {
    chars: Vec<char>,
    pos: usize,
}

impl PyLiteralReader {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), String> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(format!("expected '{c}' at {}", self.pos))
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn finish(&mut self, items: Vec<String>) -> Result<Vec<String>, String> {
        self.skip_ws();
        if self.pos == self.chars.len() {
            Ok(items)
        } else {
            Err(format!("trailing input at {}", self.pos))
        }
    }

    fn item(&mut self) -> Result<String, String> {
        match self.peek() {
            Some(q @ ('\'' | '"')) => {
                self.pos += 1;
                self.string(q)
            }
            Some(_) => {
                let start = self.pos;
                while self.peek().is_some_and(|c| c != ',' && c != ']') {
                    self.pos += 1;
                }
                let raw: String = self.chars[start..self.pos].iter().collect();
                let raw = raw.trim();
                if raw.is_empty() {
                    return Err(format!("empty element at {start}"));
                }
                Ok(raw.to_string())
            }
            None => Err("unexpected end of list".to_string()),
        }
    }

    fn string(&mut self, quote: char) -> Result<String, String> {
        let mut out = String::new();
        loop {
            let c = self.bump().ok_or("unterminated string")?;
            match c {
                c if c == quote => return Ok(out),
                '\\' => {
                    let esc = self.bump().ok_or("dangling escape")?;
                    match esc {
                        'n' => out.push('\n'),
                        'r' => out.push('\r'),
                        't' => out.push('\t'),
                        '0' => out.push('\0'),
                        'x' => out.push(self.hex_escape(2)?),
                        'u' => out.push(self.hex_escape(4)?),
                        'U' => out.push(self.hex_escape(8)?),
                        '\\' | '\'' | '"' => out.push(esc),
                        other => {
                            // Unknown escapes stay as written.
                            out.push('\\');
                            out.push(other);
                        }
                    }
                }
                c => out.push(c),
            }
        }
    }

    fn hex_escape(&mut self, digits: usize) -> Result<char, String> {
        let mut code = 0u32;
        for _ in 0..digits {
            let d = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or("bad hex escape")?;
            code = code * 16 + d;
        }
        char::from_u32(code).ok_or_else(|| format!("invalid code point {code:#x}"))
    }
}
