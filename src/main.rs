//! fsakit - finite-state automaton editor and simulator
//!
//! Provides both an interactive editor (REPL) and one-shot commands.

mod commands;
mod config;
mod repl;

use clap::{Parser, Subcommand};
use colored::Colorize;
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fsakit")]
#[command(about = "Edit and simulate non-deterministic finite-state automata")]
#[command(version)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, env = config::CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Start the interactive editor
    Repl {
        /// Automaton file to open
        file: Option<PathBuf>,
    },

    /// Validate an automaton file
    Check {
        /// Automaton file
        file: PathBuf,
    },

    /// Print an automaton in canonical form
    Show {
        /// Automaton file
        file: PathBuf,

        /// Print a JSON snapshot instead
        #[arg(long)]
        json: bool,
    },

    /// Rewrite an automaton file in canonical form
    Fmt {
        /// Automaton file
        file: PathBuf,

        /// Write here instead of in place
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a sequence of events and report whether it is recognised
    Run {
        /// Automaton file
        file: PathBuf,

        /// Events to feed, in order (`?` for an epsilon-only step)
        events: Vec<String>,

        /// Print the current states after every step
        #[arg(short, long)]
        trace: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration (explicit path, then FSAKIT_CONFIG, then defaults)
    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(?config, "configuration loaded");

    if cli.no_color || !config.output.color {
        colored::control::set_override(false);
    }

    match cli.command {
        Some(Commands::Repl { file }) => repl::run(file, &config)?,
        None => repl::run(None, &config)?,
        Some(cmd) => match commands::execute(cmd) {
            Ok(outcome) => {
                println!("{}", outcome.output);
                if !outcome.success {
                    std::process::exit(2);
                }
            }
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
