//! Interactive REPL.

use crate::commands;
use crate::config::Config;
use colored::Colorize;
use fsakit_core::{
    format, Automaton, GraphError, Notification, NotificationLog, StateChange, StateId,
};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::path::{Path, PathBuf};

const HELP_TEXT: &str = r#"
Available commands:
  help                               Show this help

  new                                Start an empty automaton
  load <file>                        Open an automaton file
  save [file]                        Write the automaton (default: last file)
  show                               Print the automaton in canonical form

  state <name> <x> <y>               Create a state
  delete <name>                      Remove a state and its transitions
  transition <from> <event> <to>     Create a transition (`?` for epsilon)
  untransition <from> <event> <to>   Remove a transition
  initial <name> / uninitial <name>  Mark or unmark a start state
  final <name> / unfinal <name>      Mark or unmark an accepting state
  move <name> <dx> <dy>              Move a state

  reset                              Start a simulation
  step [event]                       Advance (no event: epsilon moves only)
  recognised                         Is the input so far accepted?
  current                            List the current states

  watch on|off                       Print change notifications

  quit, exit                         Exit the REPL
"#;

/// Editor state behind the prompt.
pub struct Session {
    fsa: Automaton,
    path: Option<PathBuf>,
    log: NotificationLog,
    watch: bool,
}

impl Session {
    pub fn new(watch: bool) -> Self {
        let mut fsa = Automaton::new();
        let log = NotificationLog::new();
        fsa.subscribe(log.listener());
        Self {
            fsa,
            path: None,
            log,
            watch,
        }
    }

    #[cfg(test)]
    pub fn automaton(&self) -> &Automaton {
        &self.fsa
    }

    /// Replaces the automaton with the contents of `path`. On failure the
    /// session continues with an empty automaton.
    pub fn open(&mut self, path: &Path) -> Result<String, Box<dyn std::error::Error>> {
        let result = commands::load(path);
        let (fsa, outcome) = match result {
            Ok(fsa) => (fsa, Ok(())),
            Err(e) => (Automaton::new(), Err(e)),
        };
        self.replace(fsa)?;
        if let Err(e) = outcome {
            tracing::warn!("load failed, continuing with an empty automaton: {}", e);
            return Err(e);
        }

        self.path = Some(path.to_path_buf());
        Ok(format!(
            "{} {}\n{}",
            "Loaded".green(),
            path.display().to_string().cyan(),
            commands::summary(&self.fsa)
        ))
    }

    fn replace(&mut self, fsa: Automaton) -> Result<(), GraphError> {
        self.fsa = fsa;
        self.path = None;
        self.log.take();
        self.attach()
    }

    /// Routes every channel of the automaton into the session log.
    fn attach(&mut self) -> Result<(), GraphError> {
        self.fsa.subscribe(self.log.listener());
        let states: Vec<StateId> = self.fsa.states().map(|(id, _)| id).collect();
        for id in states {
            self.fsa.subscribe_state(id, self.log.listener())?;
        }
        let transitions: Vec<_> = self.fsa.transitions().map(|(id, _)| id).collect();
        for id in transitions {
            self.fsa.subscribe_transition(id, self.log.listener())?;
        }
        Ok(())
    }

    fn require(&self, name: &str) -> Result<StateId, Box<dyn std::error::Error>> {
        self.fsa
            .find_state(name)
            .ok_or_else(|| format!("no state named '{}'", name).into())
    }

    /// Executes one command line. Returns `None` when the user asks to quit.
    pub fn execute(&mut self, line: &str) -> Result<Option<String>, Box<dyn std::error::Error>> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            return Ok(Some(String::new()));
        }

        let cmd = parts[0].to_lowercase();
        let args = &parts[1..];

        let mut output = match cmd.as_str() {
            "help" | "?" => HELP_TEXT.trim().to_string(),

            "quit" | "exit" => return Ok(None),

            "new" => {
                self.replace(Automaton::new())?;
                "New automaton".green().to_string()
            }

            "load" => {
                let [file] = args else {
                    return Err("Usage: load <file>".into());
                };
                self.open(Path::new(file))?
            }

            "save" => {
                let path = match args {
                    [file] => PathBuf::from(file),
                    [] => self.path.clone().ok_or("Usage: save <file>")?,
                    _ => return Err("Usage: save [file]".into()),
                };
                format::write_path(&self.fsa, &path)?;
                let message = format!("{} {}", "Saved".green(), path.display().to_string().cyan());
                self.path = Some(path);
                message
            }

            "show" => {
                if self.fsa.state_count() == 0 {
                    "(empty)".dimmed().to_string()
                } else {
                    self.fsa.serialize().trim_end().to_string()
                }
            }

            "state" => {
                let [name, x, y] = args else {
                    return Err("Usage: state <name> <x> <y>".into());
                };
                let x: i32 = x.parse().map_err(|_| format!("invalid coordinate '{}'", x))?;
                let y: i32 = y.parse().map_err(|_| format!("invalid coordinate '{}'", y))?;
                let id = self.fsa.create_state(name, x, y)?;
                self.fsa.subscribe_state(id, self.log.listener())?;
                format!("Created state {}", name.cyan())
            }

            "delete" => {
                let [name] = args else {
                    return Err("Usage: delete <name>".into());
                };
                let id = self.require(name)?;
                self.fsa.remove_state(id);
                format!("Removed state {}", name.cyan())
            }

            "transition" => {
                let [from, event, to] = args else {
                    return Err("Usage: transition <from> <event> <to>".into());
                };
                let (from_id, to_id) = (self.require(from)?, self.require(to)?);
                let id = self
                    .fsa
                    .create_transition(from_id, to_id, commands::parse_event(event))?;
                self.fsa.subscribe_transition(id, self.log.listener())?;
                format!("Created transition {} -{}-> {}", from, event, to)
            }

            "untransition" => {
                let [from, event, to] = args else {
                    return Err("Usage: untransition <from> <event> <to>".into());
                };
                let (from_id, to_id) = (self.require(from)?, self.require(to)?);
                let event = commands::parse_event(event);
                let found = self
                    .fsa
                    .find_transitions(from_id, to_id)?
                    .into_iter()
                    .find(|t| self.fsa.transition(*t).is_some_and(|t| t.event() == event));
                let id = found.ok_or("no such transition")?;
                self.fsa.remove_transition(id);
                format!(
                    "Removed transition {} -{}-> {}",
                    from,
                    event.unwrap_or(format::EPSILON),
                    to
                )
            }

            "initial" | "uninitial" | "final" | "unfinal" => {
                let [name] = args else {
                    return Err(format!("Usage: {} <name>", cmd).into());
                };
                let id = self.require(name)?;
                match cmd.as_str() {
                    "initial" => self.fsa.set_initial(id, true)?,
                    "uninitial" => self.fsa.set_initial(id, false)?,
                    "final" => self.fsa.set_final(id, true)?,
                    _ => self.fsa.set_final(id, false)?,
                }
                commands::summary(&self.fsa)
            }

            "move" => {
                let [name, dx, dy] = args else {
                    return Err("Usage: move <name> <dx> <dy>".into());
                };
                let id = self.require(name)?;
                let dx: i32 = dx.parse().map_err(|_| format!("invalid offset '{}'", dx))?;
                let dy: i32 = dy.parse().map_err(|_| format!("invalid offset '{}'", dy))?;
                self.fsa.move_by(id, dx, dy)?;
                let position = self.fsa.state(id).map(|s| s.position()).unwrap_or_default();
                format!("{} at ({}, {})", name.cyan(), position.x, position.y)
            }

            "reset" => {
                self.fsa.reset();
                self.current()
            }

            "step" => {
                let event = match args {
                    [] => None,
                    [event] => commands::parse_event(event),
                    _ => return Err("Usage: step [event]".into()),
                };
                if !self.fsa.is_active() {
                    return Err("no simulation running; use 'reset' first".into());
                }
                self.fsa.step(event);
                self.current()
            }

            "recognised" | "recognized" => {
                if self.fsa.is_recognised() {
                    "ACCEPTED".green().to_string()
                } else {
                    "REJECTED".red().to_string()
                }
            }

            "current" => self.current(),

            "watch" => {
                self.watch = match args {
                    ["on"] => true,
                    ["off"] => false,
                    [] => !self.watch,
                    _ => return Err("Usage: watch on|off".into()),
                };
                self.log.take();
                format!("watch {}", if self.watch { "on" } else { "off" })
            }

            _ => {
                return Err(format!(
                    "Unknown command: {}. Type 'help' for available commands.",
                    cmd
                )
                .into())
            }
        };

        let notifications = self.log.take();
        if self.watch && !notifications.is_empty() {
            let lines: Vec<String> = notifications.iter().map(|n| self.describe(n)).collect();
            output = format!("{}\n{}", lines.join("\n").dimmed(), output);
        }

        Ok(Some(output))
    }

    fn current(&self) -> String {
        if !self.fsa.is_active() {
            return "inactive".dimmed().to_string();
        }
        commands::state_set(&self.fsa, &self.fsa.current_states())
    }

    fn describe(&self, notification: &Notification) -> String {
        match notification {
            Notification::StatesChanged => "* states changed".to_string(),
            Notification::TransitionsChanged => "* transitions changed".to_string(),
            Notification::OtherChanged => "* simulation changed".to_string(),
            Notification::State {
                state,
                change: StateChange::Removed,
            } => format!("* state {} removed", state),
            Notification::State { state, change } => {
                let what = match change {
                    StateChange::Position => "moved",
                    StateChange::Initial => "initial flag changed",
                    StateChange::Final => "final flag changed",
                    StateChange::Current => "current flag changed",
                    StateChange::Removed => "removed",
                };
                format!("* state {} {}", self.fsa.state_name(*state), what)
            }
            Notification::Transition { transition, .. } => {
                format!("* transition {} removed", transition)
            }
        }
    }
}

pub fn run(file: Option<PathBuf>, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "fsakit".bold().cyan());

    let mut session = Session::new(config.repl.watch);
    if let Some(path) = file {
        match session.open(&path) {
            Ok(output) => println!("{}", output),
            Err(e) => println!("{}: {}", "Error".red(), e),
        }
    }

    // Create readline editor
    let rl_config = rustyline::Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(rl_config)?;

    // Load history
    let history_path = config.repl.history_path();
    let _ = rl.load_history(&history_path);

    println!("Type 'help' for available commands.\n");

    loop {
        let prompt = format!("{} ", config.repl.prompt.cyan());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match session.execute(line) {
                    Ok(Some(output)) => println!("{}\n", output),
                    Ok(None) => break, // Exit command
                    Err(e) => println!("{}: {}\n", "Error".red(), e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        }
    }

    // Save history
    let _ = rl.save_history(&history_path);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn session() -> Session {
        colored::control::set_override(false);
        Session::new(false)
    }

    fn run_all(session: &mut Session, lines: &[&str]) {
        for line in lines {
            session.execute(line).unwrap();
        }
    }

    #[test]
    fn test_edit_and_simulate() {
        let mut s = session();
        run_all(
            &mut s,
            &[
                "state a 0 0",
                "state b 10 0",
                "transition a x b",
                "initial a",
                "final b",
            ],
        );

        assert_eq!(s.execute("reset").unwrap().unwrap(), "{a}");
        assert_eq!(s.execute("recognised").unwrap().unwrap(), "REJECTED");
        assert_eq!(s.execute("step x").unwrap().unwrap(), "{b}");
        assert_eq!(s.execute("recognised").unwrap().unwrap(), "ACCEPTED");
    }

    #[test]
    fn test_step_requires_reset() {
        let mut s = session();
        run_all(&mut s, &["state a 0 0"]);
        assert!(s.execute("step").is_err());
        assert_eq!(s.execute("current").unwrap().unwrap(), "inactive");
    }

    #[test]
    fn test_untransition_and_delete() {
        let mut s = session();
        run_all(
            &mut s,
            &[
                "state a 0 0",
                "state b 0 0",
                "transition a x b",
                "transition a ? b",
                "untransition a ? b",
            ],
        );
        assert_eq!(s.automaton().transition_count(), 1);
        assert!(s.execute("untransition a ? b").is_err());

        s.execute("delete b").unwrap();
        assert_eq!(s.automaton().state_count(), 1);
        assert_eq!(s.automaton().transition_count(), 0);
    }

    #[test]
    fn test_rejected_edits_report_errors() {
        let mut s = session();
        run_all(&mut s, &["state a 0 0"]);
        assert!(s.execute("state a 1 1").is_err());
        assert!(s.execute("state 1x 0 0").is_err());
        assert!(s.execute("state b zero 0").is_err());
        assert!(s.execute("transition a x nowhere").is_err());
        assert!(s.execute("bogus").is_err());
        assert_eq!(s.automaton().state_count(), 1);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("m.fsa");
        let path_str = path.to_str().unwrap();

        let mut s = session();
        run_all(&mut s, &["state a 3 4", "initial a"]);
        s.execute(&format!("save {}", path_str)).unwrap();

        let mut other = session();
        other.execute(&format!("load {}", path_str)).unwrap();
        assert_eq!(other.automaton().serialize(), "state a 3 4\ninitial a\n");

        // Saving again without a path reuses the loaded file.
        other.execute("move a 1 1").unwrap();
        other.execute("save").unwrap();
        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .starts_with("state a 4 5"));
    }

    #[test]
    fn test_failed_load_leaves_empty_automaton() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.fsa");
        std::fs::write(&path, "state a 0 0\nfinal b\n").unwrap();

        let mut s = session();
        run_all(&mut s, &["state keep 0 0"]);
        let err = s
            .execute(&format!("load {}", path.to_str().unwrap()))
            .unwrap_err();
        assert!(err.to_string().contains("line 2"));
        assert_eq!(s.automaton().state_count(), 0);
        assert!(s.execute("save").is_err());
    }

    #[test]
    fn test_watch_prints_notifications() {
        let mut s = session();
        s.execute("watch on").unwrap();

        let out = s.execute("state a 0 0").unwrap().unwrap();
        assert!(out.starts_with("* states changed"));

        let out = s.execute("initial a").unwrap().unwrap();
        assert!(out.starts_with("* state a initial flag changed"));

        let out = s.execute("reset").unwrap().unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec!["* state a current flag changed", "* simulation changed", "{a}"]
        );

        s.execute("watch off").unwrap();
        assert_eq!(s.execute("reset").unwrap().unwrap(), "{a}");
    }

    #[test]
    fn test_watch_names_loaded_states() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("m.fsa");
        std::fs::write(&path, "state a 0 0\nstate b 0 0\ntransition a x b\n").unwrap();

        let mut s = session();
        s.execute(&format!("load {}", path.to_str().unwrap())).unwrap();
        s.execute("watch on").unwrap();

        let out = s.execute("move b 2 3").unwrap().unwrap();
        assert!(out.starts_with("* state b moved"));

        let out = s.execute("delete b").unwrap().unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "* transition t0 removed",
                "* transitions changed",
                "* state s1 removed",
                "* states changed",
                "Removed state b",
            ]
        );
    }

    #[test]
    fn test_quit() {
        let mut s = session();
        assert!(s.execute("quit").unwrap().is_none());
        assert!(s.execute("exit").unwrap().is_none());
    }
}
