pub mod actions;
pub mod logical;
pub mod math;
pub mod operators;
pub mod sheet_ops;
pub mod stubs;
pub mod text;
pub(crate) mod utils;
pub mod workspace;

use crate::function_registry::FunctionRegistry;

pub fn load_builtins(registry: &mut FunctionRegistry) {
    operators::register_builtins(registry);
    text::register_builtins(registry);
    math::register_builtins(registry);
    logical::register_builtins(registry);
    actions::register_builtins(registry);
    stubs::register_builtins(registry);
    crate::register_functions!(
        registry;
        sheet_ops::FormulaFn::FORMULA,
        sheet_ops::FormulaFn::FORMULA_FILL,
        sheet_ops::SetValueFn,
        workspace::GetWorkspaceFn::default(),
    );
}
