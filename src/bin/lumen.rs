use std::{fs, path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};

use lumen::{Interpreter, InterpreterConfig, LumenError, Repl, logging};

#[derive(Parser)]
#[command(author, version, about = "Lumen language interpreter")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a Lumen script file
    Run {
        script: PathBuf,
        /// Report failures as JSON instead of rendered text
        #[arg(long)]
        json: bool,
        /// Abort after this many executed statements
        #[arg(long, value_name = "N")]
        max_steps: Option<u64>,
        /// Maximum nesting of function calls
        #[arg(long, value_name = "N")]
        max_depth: Option<usize>,
    },
    /// Evaluate a snippet of Lumen code and print its value
    Eval { source: String },
    /// Parse a script without running it
    Check { script: PathBuf },
    /// Start an interactive REPL session
    Repl,
}

fn main() -> ExitCode {
    logging::init_tracing();
    let args = Args::parse();
    let outcome = match args.command.unwrap_or(Command::Repl) {
        Command::Run {
            script,
            json,
            max_steps,
            max_depth,
        } => {
            let mut config = InterpreterConfig::default().with_max_steps(max_steps);
            if let Some(depth) = max_depth {
                config = config.with_max_call_depth(depth);
            }
            let mut interpreter = Interpreter::with_config(config);
            let result = interpreter.run_file(&script).map(|_| ());
            report_warnings(&interpreter, json);
            return finish(result, json);
        }
        Command::Eval { source } => {
            let mut interpreter = Interpreter::with_config(
                InterpreterConfig::default().with_script_name("<eval>"),
            );
            let result = interpreter.eval_source(&source).map(|value| {
                if !value.is_none() {
                    println!("{}", value.repr());
                }
            });
            report_warnings(&interpreter, false);
            result
        }
        Command::Check { script } => check_script(script),
        Command::Repl => Repl::new().run(),
    };
    finish(outcome, false)
}

fn check_script(path: PathBuf) -> Result<(), LumenError> {
    let source = fs::read_to_string(&path)?;
    let interpreter = Interpreter::with_config(
        InterpreterConfig::default().with_script_name(path.display().to_string()),
    );
    interpreter.check_source(&source)?;
    println!("{}: ok", path.display());
    Ok(())
}

fn report_warnings(interpreter: &Interpreter, json: bool) {
    for warning in interpreter.warnings() {
        if json {
            eprintln!("{}", warning.to_json());
        } else {
            eprint!("{}", warning.format());
        }
    }
}

fn finish(result: Result<(), LumenError>, json: bool) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(LumenError::Diagnostic(diag)) => {
            if json {
                eprintln!("{}", diag.to_json());
            } else {
                eprint!("{}", diag.format());
            }
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
