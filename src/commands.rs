//! Command execution.

use crate::Commands;
use colored::Colorize;
use fsakit_core::{format, Automaton, StateId};
use std::path::Path;

/// Result of a one-shot command.
#[derive(Debug)]
pub struct Outcome {
    pub output: String,
    /// False when the command ran but its verdict is negative (a rejected
    /// input sequence).
    pub success: bool,
}

impl Outcome {
    fn ok(output: String) -> Self {
        Self {
            output,
            success: true,
        }
    }
}

/// Executes a command and returns the formatted output.
pub fn execute(cmd: Commands) -> Result<Outcome, Box<dyn std::error::Error>> {
    match cmd {
        Commands::Repl { .. } => Err("the editor runs interactively".into()),

        Commands::Check { file } => {
            let fsa = load(&file)?;
            Ok(Outcome::ok(format!(
                "{} {}\n{}",
                "OK".green(),
                file.display().to_string().cyan(),
                summary(&fsa)
            )))
        }

        Commands::Show { file, json } => {
            let fsa = load(&file)?;
            let output = if json {
                fsa.snapshot().to_json()?
            } else {
                fsa.serialize().trim_end().to_string()
            };
            Ok(Outcome::ok(output))
        }

        Commands::Fmt { file, output } => {
            let fsa = load(&file)?;
            let target = output.as_deref().unwrap_or(&file);
            format::write_path(&fsa, target)?;
            Ok(Outcome::ok(format!(
                "{} {}",
                "Formatted".green(),
                target.display().to_string().cyan()
            )))
        }

        Commands::Run {
            file,
            events,
            trace,
        } => {
            let mut fsa = load(&file)?;
            Ok(run(&mut fsa, &events, trace))
        }
    }
}

/// Reads an automaton file, prefixing errors with the path.
pub fn load(path: &Path) -> Result<Automaton, Box<dyn std::error::Error>> {
    format::read_path(path).map_err(|e| format!("{}: {}", path.display(), e).into())
}

/// Resets `fsa`, feeds it `events` and reports whether the sequence is
/// recognised. `?` stands for an epsilon-only step.
pub fn run(fsa: &mut Automaton, events: &[String], trace: bool) -> Outcome {
    let mut output = String::new();

    fsa.reset();
    if trace {
        output.push_str(&format!(
            "{:>12}  {}\n",
            "reset".dimmed(),
            state_set(fsa, &fsa.current_states())
        ));
    }

    for event in events {
        fsa.step(parse_event(event));
        if trace {
            output.push_str(&format!(
                "{:>12}  {}\n",
                event.cyan(),
                state_set(fsa, &fsa.current_states())
            ));
        }
    }

    let accepted = fsa.is_recognised();
    if accepted {
        output.push_str(&"ACCEPTED".green().to_string());
    } else {
        output.push_str(&"REJECTED".red().to_string());
    }

    Outcome {
        output,
        success: accepted,
    }
}

/// `?` denotes epsilon; anything else is an event label.
pub fn parse_event(token: &str) -> Option<&str> {
    (token != format::EPSILON).then_some(token)
}

/// Formats a set of states as `{a, b, c}`.
pub fn state_set(fsa: &Automaton, ids: &[StateId]) -> String {
    let names: Vec<&str> = ids.iter().map(|id| fsa.state_name(*id)).collect();
    format!("{{{}}}", names.join(", "))
}

/// One-paragraph description of an automaton.
pub fn summary(fsa: &Automaton) -> String {
    format!(
        "  States: {}\n  Transitions: {}\n  Initial: {}\n  Final: {}",
        fsa.state_count(),
        fsa.transition_count(),
        state_set(fsa, &fsa.initial_states()),
        state_set(fsa, &fsa.final_states())
    )
}
