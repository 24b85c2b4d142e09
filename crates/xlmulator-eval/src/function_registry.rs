use std::sync::Arc;

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};
use xlmulator_common::{Value, XlmError};

use crate::function::{FnCaps, Function, FunctionContext};

/// Name → emulation table. Names are case-insensitive.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    map: FxHashMap<String, Arc<dyn Function>>,
}

static BUILTINS: Lazy<Arc<FunctionRegistry>> =
    Lazy::new(|| Arc::new(FunctionRegistry::with_builtins()));

/// The shared registry holding the built-in library, built on first use.
pub fn builtin_registry() -> Arc<FunctionRegistry> {
    Arc::clone(&BUILTINS)
}

impl FunctionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::builtins::load_builtins(&mut registry);
        registry
    }

    /// Register `f`, returning any emulation it replaces.
    pub fn register(&mut self, f: Arc<dyn Function>) -> Option<Arc<dyn Function>> {
        self.map.insert(f.name().to_ascii_uppercase(), f)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.map.get(&name.to_ascii_uppercase()).map(Arc::clone)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(&name.to_ascii_uppercase())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.map.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Run the emulation registered under `name`.
    pub fn dispatch(
        &self,
        name: &str,
        args: &[Value],
        ctx: &mut FunctionContext<'_>,
    ) -> Result<Value, XlmError> {
        let Some(f) = self.get(name) else {
            warn!(category = "unknown_function", function = %name, "no emulation registered");
            return Err(XlmError::UnknownFunction(name.to_string()));
        };
        if args.len() < f.min_args() {
            return Err(XlmError::Arity {
                function: f.name().to_string(),
                expected: f.min_args(),
                found: args.len(),
            });
        }
        let out = f.eval(args, ctx)?;
        let caps = f.caps();
        if caps.contains(FnCaps::ACTION) {
            debug!(category = "action", function = %f.name(), cell = ?ctx.caller, result = %out, "action emulated");
        } else if caps.contains(FnCaps::STUB) {
            debug!(category = "stub", function = %f.name(), "placeholder returned for unemulated function");
        }
        trace!(function = %name, argc = args.len(), result = ?out, "dispatched");
        Ok(out)
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.map.len())
            .finish()
    }
}
