// ABOUTME: Configuration and constants for the interpreter and its shell

use std::path::PathBuf;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const WELCOME_MESSAGE: &str = "Slight";
pub const WELCOME_SUBTITLE: &str = "a small Lisp with fexprs, macros, and processes";

/// Prompt for a fresh expression
pub const PROMPT: &str = "? ";
/// Prompt while parens are unbalanced
pub const PROMPT_MORE: &str = "... ";
/// REPL escape command
pub const QUIT_COMMAND: &str = ":q";

/// Runtime configuration assembled from CLI flags
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Extra directories searched by `include`, in order
    pub include_paths: Vec<PathBuf>,
    /// Command invoked over stdio by the `AI::repl` host action
    pub agent_command: Option<String>,
    /// Skip evaluating the embedded prelude at startup
    pub load_prelude: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            include_paths: Vec::new(),
            agent_command: None,
            load_prelude: true,
        }
    }
}
