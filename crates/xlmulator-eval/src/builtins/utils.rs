use tracing::warn;
use xlmulator_common::{Number, Value};

/// Error codes a cell can display. Functions that would fail in Excel
/// return one of these as text so `ISERROR` can see them.
pub const ERROR_CODES: &[&str] = &[
    "#NULL!", "#DIV/0!", "#VALUE!", "#REF!", "#NAME?", "#NUM!", "#N/A",
];

pub const VALUE_ERROR: &str = "#VALUE!";

pub fn value_error() -> Value {
    Value::from(VALUE_ERROR)
}

pub fn is_error_text(v: &Value) -> bool {
    matches!(v, Value::Text(s) if ERROR_CODES.contains(&s.as_str()))
}

/// Numeric view of an operand for `function`. Empty text counts as zero;
/// other non-numeric values count as zero with a logged warning.
pub fn number_or_zero(function: &str, v: &Value) -> Number {
    if let Some(n) = v.to_number() {
        return n;
    }
    if !v.is_empty_text() {
        warn!(
            category = "conversion",
            function = %function,
            value = %v,
            "non-numeric operand treated as 0"
        );
    }
    Number::Int(0)
}

/// Integer view of an optional argument, for counts and positions.
pub fn int_arg(function: &str, args: &[Value], idx: usize, default: i64) -> i64 {
    match args.get(idx) {
        None => default,
        Some(v) if v.is_empty_text() => default,
        Some(v) => match v.to_i64() {
            Some(i) => i,
            None => {
                warn!(
                    category = "conversion",
                    function = %function,
                    value = %v,
                    "non-numeric count; using default"
                );
                default
            }
        },
    }
}

/// Display text of an argument, empty when absent.
pub fn text_arg(args: &[Value], idx: usize) -> String {
    args.get(idx).map(Value::to_string).unwrap_or_default()
}

/// Arguments rendered as a cell would show them, joined with `", "`.
pub fn join_display(args: &[Value]) -> String {
    args.iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Round half away from zero, as Excel's ROUND does.
pub fn round_to_precision(n: f64, digits: i32) -> f64 {
    if digits < 0 {
        let factor = 10f64.powi(-digits);
        return (n / factor).round() * factor;
    }
    let factor = 10f64.powi(digits);
    (n * factor).round() / factor
}
