use std::sync::Arc;

use tracing::warn;
use xlmulator_common::{Value, XlmError};

use super::utils::{int_arg, text_arg, value_error};
use crate::function::{Builtin, FunctionContext};
use crate::function_registry::FunctionRegistry;

/// Longest string REPT will build.
pub const MAX_TEXT_LEN: usize = 32_767;

pub const TEXT_FUNCTIONS: &[Builtin] = &[
    Builtin::pure("CHAR", 1, char_fn),
    Builtin::pure("CODE", 1, code_fn),
    Builtin::pure("CONCATENATE", 0, concatenate_fn),
    Builtin::pure("LEN", 1, len_fn),
    Builtin::pure("MID", 3, mid_fn),
    Builtin::pure("LEFT", 1, left_fn),
    Builtin::pure("RIGHT", 1, right_fn),
    Builtin::pure("LOWER", 1, lower_fn),
    Builtin::pure("UPPER", 1, upper_fn),
    Builtin::pure("TRIM", 1, trim_fn),
    Builtin::pure("SUBSTITUTE", 3, substitute_fn),
    Builtin::pure("FIND", 2, find_fn),
    Builtin::pure("SEARCH", 2, search_fn),
    Builtin::pure("REPT", 2, rept_fn),
    Builtin::pure("T", 1, t_fn),
    Builtin::pure("VALUE", 1, value_fn),
];

pub fn register_builtins(registry: &mut FunctionRegistry) {
    for f in TEXT_FUNCTIONS {
        registry.register(Arc::new(*f));
    }
}

/* ─────────────────────────────── CHAR ─────────────────────────────── */

/// Placeholder for a code point that does not map to a character.
pub const CHAR_PLACEHOLDER: &str = "?";

fn char_fn(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    let decoded = args[0]
        .to_i64()
        .and_then(|code| u32::try_from(code).ok())
        .and_then(char::from_u32);
    match decoded {
        Some(ch) => Ok(Value::Text(ch.to_string())),
        None => {
            warn!(category = "char_out_of_range", code = %args[0], "CHAR code has no character");
            Ok(Value::from(CHAR_PLACEHOLDER))
        }
    }
}

fn code_fn(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    match args[0].to_string().chars().next() {
        Some(ch) => Ok(Value::Int(i64::from(u32::from(ch)))),
        None => Ok(value_error()),
    }
}

/* ─────────────────────────── concatenation ────────────────────────── */

fn concatenate_fn(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    Ok(Value::Text(args.iter().map(Value::to_string).collect()))
}

fn rept_fn(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    let s = args[0].to_string();
    let n = int_arg("REPT", args, 1, 0);
    if n < 0 {
        return Ok(value_error());
    }
    let n = usize::try_from(n).unwrap_or(usize::MAX);
    if s.is_empty() || n == 0 {
        return Ok(Value::empty());
    }
    let fit = MAX_TEXT_LEN / s.len();
    if n > fit {
        warn!(category = "conversion", count = n, "REPT result truncated");
    }
    Ok(Value::Text(s.repeat(n.min(fit))))
}

/* ───────────────────────────── slicing ────────────────────────────── */

fn len_fn(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    let n = args[0].to_string().chars().count();
    Ok(Value::Int(i64::try_from(n).unwrap_or(i64::MAX)))
}

fn take_chars(s: &str, skip: usize, take: usize) -> String {
    s.chars().skip(skip).take(take).collect()
}

fn mid_fn(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    let s = args[0].to_string();
    let start = int_arg("MID", args, 1, 1);
    let count = int_arg("MID", args, 2, 0);
    if start < 1 || count < 0 {
        return Ok(value_error());
    }
    let skip = usize::try_from(start - 1).unwrap_or(usize::MAX);
    let take = usize::try_from(count).unwrap_or(usize::MAX);
    Ok(Value::Text(take_chars(&s, skip, take)))
}

fn left_fn(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    let s = args[0].to_string();
    let count = int_arg("LEFT", args, 1, 1);
    if count < 0 {
        return Ok(value_error());
    }
    let take = usize::try_from(count).unwrap_or(usize::MAX);
    Ok(Value::Text(take_chars(&s, 0, take)))
}

fn right_fn(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    let s = args[0].to_string();
    let count = int_arg("RIGHT", args, 1, 1);
    if count < 0 {
        return Ok(value_error());
    }
    let len = s.chars().count();
    let take = usize::try_from(count).unwrap_or(usize::MAX).min(len);
    Ok(Value::Text(take_chars(&s, len - take, take)))
}

/* ───────────────────────────── case/space ─────────────────────────── */

fn lower_fn(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    Ok(Value::Text(args[0].to_string().to_lowercase()))
}

fn upper_fn(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    Ok(Value::Text(args[0].to_string().to_uppercase()))
}

/// Strips leading/trailing spaces and collapses inner runs to one space.
fn trim_fn(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    let s = args[0].to_string();
    Ok(Value::Text(
        s.split(' ')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
    ))
}

fn substitute_fn(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    let text = args[0].to_string();
    let old = args[1].to_string();
    let new = text_arg(args, 2);
    if old.is_empty() {
        return Ok(Value::Text(text));
    }
    if args.len() < 4 {
        return Ok(Value::Text(text.replace(&old, &new)));
    }
    let instance = int_arg("SUBSTITUTE", args, 3, 1);
    if instance < 1 {
        return Ok(value_error());
    }
    let nth = usize::try_from(instance - 1).unwrap_or(usize::MAX);
    Ok(Value::Text(match text.match_indices(&old).nth(nth) {
        Some((at, _)) => format!("{}{}{}", &text[..at], new, &text[at + old.len()..]),
        None => text,
    }))
}

/* ───────────────────────────── searching ──────────────────────────── */

/// 1-based character position of `needle` in `haystack` at or after
/// character `start`.
fn position(needle: &str, haystack: &str, start: i64) -> Option<i64> {
    let skip = usize::try_from(start.checked_sub(1)?).ok()?;
    let byte_start = match haystack.char_indices().nth(skip) {
        Some((b, _)) => b,
        None if skip == haystack.chars().count() => haystack.len(),
        None => return None,
    };
    let found = haystack[byte_start..].find(needle)? + byte_start;
    let chars = haystack[..found].chars().count();
    i64::try_from(chars + 1).ok()
}

fn find_fn(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    let needle = args[0].to_string();
    let haystack = args[1].to_string();
    let start = int_arg("FIND", args, 2, 1);
    Ok(position(&needle, &haystack, start).map_or_else(value_error, Value::Int))
}

fn search_fn(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    let needle = args[0].to_string().to_lowercase();
    let haystack = args[1].to_string().to_lowercase();
    let start = int_arg("SEARCH", args, 2, 1);
    Ok(position(&needle, &haystack, start).map_or_else(value_error, Value::Int))
}

/* ───────────────────────────── conversion ─────────────────────────── */

fn t_fn(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    Ok(match &args[0] {
        Value::Text(s) => Value::Text(s.clone()),
        _ => Value::empty(),
    })
}

fn value_fn(args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
    Ok(match &args[0] {
        Value::Bool(_) => value_error(),
        v => v.to_number().map_or_else(value_error, Value::from),
    })
}
