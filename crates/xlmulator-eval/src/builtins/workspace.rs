//! `GET.WORKSPACE`, the environment probe.
//!
//! Sandbox-aware macros query the workspace and bail out when the answers
//! look like an analysis box. The emulation answers like an ordinary
//! desktop installation.

use tracing::debug;
use xlmulator_common::{Value, XlmError};

use crate::function::{FnCaps, Function, FunctionContext};

/// Answers for the `GET.WORKSPACE` type numbers the emulator models.
#[derive(Debug, Clone)]
pub struct WorkspaceProfile {
    /// Type 1: name of the environment.
    pub environment: String,
    /// Type 2: Excel version.
    pub version: String,
    /// Type 13: usable workspace width, in points.
    pub width: i64,
    /// Type 14: usable workspace height, in points.
    pub height: i64,
}

impl Default for WorkspaceProfile {
    fn default() -> Self {
        Self {
            environment: "Windows (64-bit) NT 10.00".to_string(),
            version: "16.0".to_string(),
            width: 1536,
            height: 754,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GetWorkspaceFn {
    pub profile: WorkspaceProfile,
}

impl Function for GetWorkspaceFn {
    fn caps(&self) -> FnCaps {
        FnCaps::ENVIRONMENT
    }

    fn name(&self) -> &'static str {
        "GET.WORKSPACE"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn eval(&self, args: &[Value], _: &mut FunctionContext<'_>) -> Result<Value, XlmError> {
        let p = &self.profile;
        Ok(match args[0].to_i64() {
            Some(1) => Value::from(p.environment.as_str()),
            Some(2) => Value::from(p.version.as_str()),
            Some(13) => Value::Int(p.width),
            Some(14) => Value::Int(p.height),
            // mouse present, sound playback available
            Some(19) | Some(42) => Value::Bool(true),
            // not in single-step mode
            Some(31) => Value::Bool(false),
            other => {
                debug!(type_num = ?other, "GET.WORKSPACE type not modeled");
                Value::from(self.name())
            }
        })
    }
}
