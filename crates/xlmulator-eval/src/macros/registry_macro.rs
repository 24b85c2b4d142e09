/// Register one or more [`Function`](crate::function::Function) values with a
/// [`FunctionRegistry`](crate::function_registry::FunctionRegistry).
///
/// ```ignore
/// register_functions!(registry; SetValueFn, FormulaFn::FORMULA);
/// ```
#[macro_export]
macro_rules! register_functions {
    ( $registry:expr; $($fn:expr),+ $(,)? ) => {{
        use std::sync::Arc;
        $(
            $registry.register(Arc::new($fn));
        )+
    }};
}
