use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use slight::config::{
    RuntimeConfig, PROMPT, PROMPT_MORE, QUIT_COMMAND, VERSION, WELCOME_MESSAGE, WELCOME_SUBTITLE,
};
use slight::error::SlightError;
use slight::parser::is_balanced;
use slight::runtime::{PromptSource, Runtime};
use slight::term::Term;
use std::path::PathBuf;

/// A small Lisp with fexprs, macros, and an actor-style process runtime
#[derive(Parser, Debug)]
#[command(name = "slight")]
#[command(version = VERSION)]
#[command(about = "A small Lisp with fexprs, macros, and processes")]
struct CliArgs {
    /// Script file to execute (starts the REPL when omitted)
    #[arg(value_name = "PATH")]
    script: Option<PathBuf>,

    /// Evaluate an expression and print its value
    #[arg(short = 'e', long = "eval", value_name = "EXPR")]
    expr: Option<String>,

    /// Prepend an include search directory (can be repeated)
    #[arg(short = 'i', long = "include", value_name = "DIR", action = clap::ArgAction::Append)]
    include: Vec<PathBuf>,

    /// Command invoked over stdio by (agent/repl)
    #[arg(long = "agent", value_name = "CMD")]
    agent: Option<String>,

    /// Skip loading the prelude
    #[arg(long = "no-prelude")]
    no_prelude: bool,
}

// ===== DEBUG=1 step tracing =====

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging() {
    let verbose = std::env::var("DEBUG").map(|v| v == "1").unwrap_or(false);
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(if verbose {
            log::LevelFilter::Trace
        } else {
            log::LevelFilter::Warn
        });
    }
}

// ===== Interactive prompt =====

/// Line editor behind the `IO::repl` host action. Reads continuation lines
/// with the `... ` prompt until parens balance; `:q` or end-of-input ends
/// the session.
struct ReplPrompt {
    editor: Editor<(), DefaultHistory>,
}

impl ReplPrompt {
    fn new() -> Result<Self, String> {
        let config = Config::builder().auto_add_history(true).build();
        let editor = Editor::with_config(config)
            .map_err(|e| format!("failed to initialize the REPL: {}", e))?;
        Ok(ReplPrompt { editor })
    }
}

impl PromptSource for ReplPrompt {
    fn read_program(&mut self, value: Option<&Term>) -> Option<String> {
        if let Some(value) = value {
            if !matches!(value, Term::Unit) {
                println!("=> {}", value);
            }
        }

        let mut buffer = String::new();
        loop {
            let prompt = if buffer.is_empty() { PROMPT } else { PROMPT_MORE };
            match self.editor.readline(prompt) {
                Ok(line) => {
                    if buffer.is_empty() {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        if trimmed == QUIT_COMMAND {
                            return None;
                        }
                    }
                    buffer.push_str(&line);
                    buffer.push('\n');
                    if is_balanced(&buffer) {
                        return Some(buffer);
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl-C abandons the current input
                    buffer.clear();
                    continue;
                }
                Err(ReadlineError::Eof) => return None,
                Err(e) => {
                    eprintln!("error: {}", e);
                    return None;
                }
            }
        }
    }
}

fn main() {
    init_logging();
    let args = CliArgs::parse();

    let config = RuntimeConfig {
        include_paths: args.include.clone(),
        agent_command: args.agent.clone(),
        load_prelude: !args.no_prelude,
    };

    let mut runtime = match Runtime::new(config) {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };

    let outcome: Result<(), SlightError> = if let Some(expr) = args.expr {
        runtime.eval_source(&expr).map(|value| {
            if !matches!(value, Term::Unit) {
                println!("{}", value);
            }
        })
    } else if let Some(script) = args.script {
        runtime.run_file(&script).map(|_| ())
    } else {
        println!("{} {} — {}", WELCOME_MESSAGE, VERSION, WELCOME_SUBTITLE);
        println!("{} to exit", QUIT_COMMAND);
        match ReplPrompt::new() {
            Ok(prompt) => runtime.repl(Box::new(prompt)),
            Err(message) => {
                eprintln!("error: {}", message);
                std::process::exit(1);
            }
        }
    };

    if let Err(e) = outcome {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
