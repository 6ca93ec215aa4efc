//! Command-line interface definition using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// AI Dispatch - hands tracker tasks to AI agent worker slots
#[derive(Parser, Debug)]
#[command(name = "ai-dispatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Env file loaded before reading configuration
    #[arg(short, long, env = "AI_DISPATCH_ENV_FILE", default_value = ".env", global = true)]
    pub env_file: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the workers and both HTTP listeners (default)
    Run {
        /// Address the listeners bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Override HOOK_SERVER_PORT
        #[arg(long)]
        hook_port: Option<u16>,

        /// Override WEBHOOK_PORT
        #[arg(long)]
        webhook_port: Option<u16>,
    },

    /// Validate configuration and print the worker slots
    Check,

    /// Write the agent hook commands into the agent settings file
    InstallHooks {
        /// Settings file (default: ~/.claude/settings.json)
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Hook server port (default: HOOK_SERVER_PORT or 8081)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

impl Cli {
    /// Returns the log level based on verbosity.
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }

    /// The command to run, `run` with defaults when none was given.
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run {
            host: "0.0.0.0".to_string(),
            hook_port: None,
            webhook_port: None,
        })
    }
}
