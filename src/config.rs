use crate::diagnostics::DEFAULT_FILE;

/// Limits and naming for one interpreter instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterConfig {
    /// File name reported in diagnostics.
    pub script_name: String,
    /// Deepest allowed nesting of user-function calls.
    pub max_call_depth: usize,
    /// Upper bound on executed statements, if any.
    pub max_steps: Option<u64>,
    /// Collect `print` output in memory instead of writing to stdout.
    pub capture_output: bool,
}

pub const DEFAULT_MAX_CALL_DEPTH: usize = 200;

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            script_name: DEFAULT_FILE.to_string(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_steps: None,
            capture_output: false,
        }
    }
}

impl InterpreterConfig {
    pub fn with_script_name(mut self, name: impl Into<String>) -> Self {
        self.script_name = name.into();
        self
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn with_max_steps(mut self, steps: Option<u64>) -> Self {
        self.max_steps = steps;
        self
    }

    pub fn capturing_output(mut self) -> Self {
        self.capture_output = true;
        self
    }
}
