use rustyline::{DefaultEditor, error::ReadlineError};

use crate::{
    config::InterpreterConfig,
    diagnostics::{LumenError, Result},
    runtime::Interpreter,
};

/// Line-oriented session over one persistent interpreter. Errors are
/// reported and the session continues.
pub struct Repl {
    interpreter: Interpreter,
}

impl Default for Repl {
    fn default() -> Self {
        Self::new()
    }
}

impl Repl {
    pub fn new() -> Self {
        Self::with_config(InterpreterConfig::default().with_script_name("<repl>"))
    }

    pub fn with_config(config: InterpreterConfig) -> Self {
        Self {
            interpreter: Interpreter::with_config(config),
        }
    }

    /// Evaluate one line and render what the user should see: the value
    /// (none is not echoed) or the formatted diagnostic.
    pub fn eval_line(&mut self, line: &str) -> Option<String> {
        let seen_warnings = self.interpreter.warnings().len();
        let mut rendered = match self.interpreter.eval_source(line) {
            Ok(value) if value.is_none() => String::new(),
            Ok(value) => format!("{}\n", value.repr()),
            Err(LumenError::Diagnostic(diag)) => diag.format(),
            Err(other) => format!("error: {other}\n"),
        };
        for warning in &self.interpreter.warnings()[seen_warnings..] {
            rendered.push_str(&warning.format());
        }
        if rendered.is_empty() {
            None
        } else {
            Some(rendered)
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut editor = DefaultEditor::new().map_err(editor_error)?;
        loop {
            match editor.readline("lumen> ") {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed == ":quit" || trimmed == ":exit" {
                        break;
                    }
                    if trimmed.is_empty() {
                        continue;
                    }
                    editor.add_history_entry(trimmed).ok();
                    if let Some(rendered) = self.eval_line(trimmed) {
                        print!("{rendered}");
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => return Err(editor_error(err)),
            }
        }
        Ok(())
    }
}

fn editor_error(err: ReadlineError) -> LumenError {
    LumenError::from(std::io::Error::other(err.to_string()))
}
