//! XLM macro emulation: the live sheet, the function library, the per-cell
//! interpreter and the priority-ordered evaluation pass.

mod macros;

pub mod actions;
pub mod builtins;
pub mod engine;
pub mod function;
pub mod function_registry;
pub mod interpreter;
pub mod report;
pub mod seed;
pub mod sheet;
pub mod test_sheet;

pub use actions::{Action, ActionKind, extract_action, extract_actions};
pub use engine::{CellFailure, Engine, EvalConfig, EvalSummary};
pub use function::{Builtin, FnCaps, Function, FunctionContext};
pub use function_registry::{FunctionRegistry, builtin_registry};
pub use interpreter::{FailedCells, Interpreter};
pub use seed::{SeedCell, SheetSeed};
pub use sheet::{Cell, Sheet};

pub use xlmulator_common::{CellCoord, Value, XlmError};
pub use xlmulator_parse::{Formula, StackItem};

#[cfg(test)]
mod tests;
