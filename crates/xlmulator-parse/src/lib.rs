mod arity;
pub mod formula;
pub mod parser;
pub mod stack_item;
pub mod tokenizer;

pub use arity::fixed_arity;
pub use formula::Formula;
pub use parser::{parse_formula, parse_formula_lenient, parse_reference};
pub use stack_item::{CellRef, Operator, StackCursor, StackItem};
pub use tokenizer::{Token, TokenType, Tokenizer, TokenizerError};

// Re-export common types
pub use xlmulator_common::{CellCoord, Value, XlmError};
