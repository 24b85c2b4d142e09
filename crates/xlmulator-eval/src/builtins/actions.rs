//! Functions whose only emulated effect is an action tag.

use std::sync::Arc;

use xlmulator_common::{Value, XlmError};

use crate::actions::{ActionKind, call_tag, exec_tag, halt_tag, tagged_call};
use crate::function::{FnCaps, Function, FunctionContext};
use crate::function_registry::FunctionRegistry;

#[derive(Debug, Clone, Copy)]
pub struct ActionFn {
    name: &'static str,
    kind: ActionKind,
    min_args: usize,
}

impl ActionFn {
    pub const fn new(name: &'static str, kind: ActionKind, min_args: usize) -> Self {
        Self {
            name,
            kind,
            min_args,
        }
    }
}

impl Function for ActionFn {
    fn caps(&self) -> FnCaps {
        FnCaps::ACTION
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn min_args(&self) -> usize {
        self.min_args
    }

    fn eval(&self, args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
        let tag = match self.kind {
            ActionKind::Call => call_tag(args),
            ActionKind::Exec => exec_tag(args),
            ActionKind::Halt => halt_tag(self.name),
            kind => tagged_call(kind, self.name, args),
        };
        Ok(Value::Text(tag))
    }
}

pub const ACTION_FUNCTIONS: &[ActionFn] = &[
    // dll, procedure, type text, arguments...
    ActionFn::new("CALL", ActionKind::Call, 2),
    ActionFn::new("REGISTER", ActionKind::Call, 2),
    ActionFn::new("EXEC", ActionKind::Exec, 1),
    ActionFn::new("HALT", ActionKind::Halt, 0),
    ActionFn::new("CLOSE", ActionKind::Halt, 0),
    ActionFn::new("FOPEN", ActionKind::File, 1),
    ActionFn::new("FWRITE", ActionKind::File, 2),
    ActionFn::new("FWRITELN", ActionKind::File, 2),
    ActionFn::new("FREAD", ActionKind::File, 2),
    ActionFn::new("FREADLN", ActionKind::File, 1),
    ActionFn::new("FCLOSE", ActionKind::File, 1),
    ActionFn::new("FILE.DELETE", ActionKind::File, 1),
    ActionFn::new("FILES", ActionKind::File, 0),
    ActionFn::new("SAVE.AS", ActionKind::File, 0),
    ActionFn::new("ALERT", ActionKind::Output, 1),
    ActionFn::new("MESSAGE", ActionKind::Output, 0),
    ActionFn::new("INPUT", ActionKind::Input, 1),
];

pub fn register_builtins(registry: &mut FunctionRegistry) {
    for f in ACTION_FUNCTIONS {
        registry.register(Arc::new(*f));
    }
}
