//! Command-line configuration.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use directories::ProjectDirs;

pub const DEFAULT_API_URL: &str = "https://todo-backend-3gwg.onrender.com";

const APP_QUALIFIER: &str = "com";
const APP_ORGANIZATION: &str = "todo";
const APP_NAME: &str = "todo-cli";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "todo", version, about = "Command-line client for the todo REST API", long_about = None)]
pub struct Cli {
    /// Base URL of the todo backend.
    #[arg(long, env = "TODO_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Where the session token is kept. Defaults to the platform config dir.
    #[arg(long, env = "TODO_SESSION_FILE", value_name = "PATH")]
    pub session_file: Option<PathBuf>,

    /// Log verbosity, overridden by `RUST_LOG`.
    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn session_path(&self) -> Option<PathBuf> {
        self.session_file.clone().or_else(|| {
            ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
                .map(|dirs| dirs.config_dir().join("session.json"))
        })
    }
}

/// Operations on the list. Positions are 1-based, as printed by `list`.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Create an account.
    Register { username: String, password: String },
    /// Log in and show the list.
    Login { username: String, password: String },
    /// Forget the stored session.
    Logout,
    /// Show the list.
    List,
    /// Add a todo.
    Add {
        #[arg(num_args = 0.., trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Flip a todo between done and not done.
    Toggle { position: usize },
    /// Delete a todo.
    Rm { position: usize },
    /// Replace a todo's text. Without text, enters edit mode (shell only).
    Edit {
        position: usize,
        #[arg(num_args = 0.., trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Abandon the edit in progress (shell only).
    Cancel,
    /// Move a todo from one position to another.
    Mv { from: usize, to: usize },
    /// Read commands from stdin against a single session.
    Shell,
}

/// One line typed at the `shell` prompt.
#[derive(Debug, Parser)]
#[command(no_binary_name = true, disable_version_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: Command,
}
