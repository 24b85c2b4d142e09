//! Argument counts for fixed-arity (non-variadic) function tokens.
//!
//! The binary token format only records the argument count for variadic
//! calls. For fixed-arity functions the count is implied by the function
//! id, so it has to come from a table. Names not listed here are resolved by
//! [`crate::StackItem::named_function`], which falls back to one argument.

/// Declared operand count for a fixed-arity function, by upper-case name.
pub fn fixed_arity(name: &str) -> Option<u8> {
    let n = match name {
        // no arguments
        "NOW" | "TODAY" | "TRUE" | "FALSE" | "PI" | "RAND" | "NA" | "RETURN" | "HALT"
        | "NEXT" | "ECHO" | "ERROR" | "APP.MAXIMIZE" | "APP.MINIMIZE" => 0,

        // one argument
        "CHAR" | "CODE" | "LEN" | "LOWER" | "UPPER" | "TRIM" | "T" | "VALUE" | "ABS" | "INT"
        | "NOT" | "ISNUMBER" | "ISTEXT" | "ISERROR" | "ISBLANK" | "GET.WORKSPACE" | "GOTO"
        | "RUN" | "WHILE" | "DAY" | "ROW" | "COLUMN" | "FCLOSE" | "FILE.DELETE" | "EXEC"
        | "SELECT" | "ACTIVATE" | "WINDOW.HIDE" | "WORKBOOK.HIDE" | "WORKBOOK.UNHIDE"
        | "WAIT" => 1,

        // two arguments
        "MOD" | "ROUND" | "REPT" | "FOPEN" | "FWRITE" | "FWRITELN" | "FREAD" | "ON.TIME"
        | "GET.CELL" | "GET.WINDOW" | "GET.DOCUMENT" | "SET.VALUE" | "FORMULA"
        | "FORMULA.FILL" | "ALERT" | "MESSAGE" | "LEFT" | "RIGHT" => 2,

        // three arguments
        "MID" | "IF" | "SUBSTITUTE" | "FIND" | "SEARCH" => 3,

        _ => return None,
    };
    Some(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_functions_have_fixed_counts() {
        assert_eq!(fixed_arity("CHAR"), Some(1));
        assert_eq!(fixed_arity("MID"), Some(3));
        assert_eq!(fixed_arity("NOW"), Some(0));
        assert_eq!(fixed_arity("SET.VALUE"), Some(2));
    }

    #[test]
    fn lookup_is_by_exact_upper_case_name() {
        assert_eq!(fixed_arity("char"), None);
        assert_eq!(fixed_arity("NO.SUCH.FUNCTION"), None);
    }
}
