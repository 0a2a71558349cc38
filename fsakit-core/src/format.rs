//! Line-oriented text format.
//!
//! One record per line, tokens separated by single spaces:
//!
//! ```text
//! # a comment
//! state q0 40 80
//! state q1 120 80
//! transition q0 coin q1
//! transition q1 ? q0
//! initial q0
//! final q1
//! ```
//!
//! `?` in the event position denotes an epsilon transition. Empty lines and
//! lines starting with `#` are ignored. States must be declared before any
//! record that references them. The writer emits all state records, then all
//! transition records, then all initial records, then all final records.

use crate::automaton::Automaton;
use crate::error::{FormatError, GraphError};
use crate::state::StateId;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Token used for the label of an epsilon transition.
pub const EPSILON: &str = "?";

/// A single record of the text format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record<'a> {
    State { name: &'a str, x: i32, y: i32 },
    Transition {
        from: &'a str,
        event: Option<&'a str>,
        to: &'a str,
    },
    Initial { name: &'a str },
    Final { name: &'a str },
}

impl<'a> Record<'a> {
    /// Parses one line. Returns `Ok(None)` for blank and comment lines.
    pub fn parse(line: usize, text: &'a str) -> Result<Option<Self>, FormatError> {
        if text.is_empty() || text.starts_with('#') {
            return Ok(None);
        }

        let mut tokens: Vec<&str> = text.split(' ').collect();
        while tokens.last() == Some(&"") {
            tokens.pop();
        }
        let Some(&keyword) = tokens.first() else {
            return Ok(None);
        };

        let expect = |record: &'static str, expected: usize| {
            if tokens.len() == expected {
                Ok(())
            } else {
                Err(FormatError::TokenCount {
                    line,
                    record,
                    expected,
                    found: tokens.len(),
                })
            }
        };

        let record = match keyword {
            "state" => {
                expect("state", 4)?;
                Record::State {
                    name: tokens[1],
                    x: parse_coordinate(line, tokens[2])?,
                    y: parse_coordinate(line, tokens[3])?,
                }
            }
            "transition" => {
                expect("transition", 4)?;
                Record::Transition {
                    from: tokens[1],
                    event: (tokens[2] != EPSILON).then_some(tokens[2]),
                    to: tokens[3],
                }
            }
            "initial" => {
                expect("initial", 2)?;
                Record::Initial { name: tokens[1] }
            }
            "final" => {
                expect("final", 2)?;
                Record::Final { name: tokens[1] }
            }
            other => {
                return Err(FormatError::UnknownRecord {
                    line,
                    keyword: other.to_string(),
                })
            }
        };

        Ok(Some(record))
    }

    /// Applies this record to `fsa` through its public operations.
    fn apply(&self, line: usize, fsa: &mut Automaton) -> Result<(), FormatError> {
        let rejected = |source: GraphError| FormatError::Rejected { line, source };

        match *self {
            Record::State { name, x, y } => {
                fsa.create_state(name, x, y).map_err(rejected)?;
            }
            Record::Transition { from, event, to } => {
                let from = lookup(fsa, line, from)?;
                let to = lookup(fsa, line, to)?;
                fsa.create_transition(from, to, event).map_err(rejected)?;
            }
            Record::Initial { name } => {
                let id = lookup(fsa, line, name)?;
                fsa.set_initial(id, true).map_err(rejected)?;
            }
            Record::Final { name } => {
                let id = lookup(fsa, line, name)?;
                fsa.set_final(id, true).map_err(rejected)?;
            }
        }
        Ok(())
    }
}

fn lookup(fsa: &Automaton, line: usize, name: &str) -> Result<StateId, FormatError> {
    fsa.find_state(name).ok_or_else(|| FormatError::UnknownState {
        line,
        name: name.to_string(),
    })
}

impl fmt::Display for Record<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::State { name, x, y } => write!(f, "state {} {} {}", name, x, y),
            Record::Transition { from, event, to } => {
                write!(f, "transition {} {} {}", from, event.unwrap_or(EPSILON), to)
            }
            Record::Initial { name } => write!(f, "initial {}", name),
            Record::Final { name } => write!(f, "final {}", name),
        }
    }
}

fn parse_coordinate(line: usize, token: &str) -> Result<i32, FormatError> {
    token.parse().map_err(|_| FormatError::InvalidCoordinate {
        line,
        value: token.to_string(),
    })
}

/// Reads an automaton. Stops at the first error; the partially built
/// automaton is discarded.
pub fn read<R: BufRead>(reader: R) -> Result<Automaton, FormatError> {
    let mut fsa = Automaton::new();
    let mut records = 0;

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let text = match line {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Err(FormatError::InvalidEncoding { line: line_no })
            }
            Err(e) => return Err(e.into()),
        };
        if let Some(record) = Record::parse(line_no, &text)? {
            record.apply(line_no, &mut fsa)?;
            records += 1;
        }
    }

    tracing::debug!(
        "read automaton: {} records, {} states, {} transitions",
        records,
        fsa.state_count(),
        fsa.transition_count()
    );
    Ok(fsa)
}

/// Parses an automaton from a string.
pub fn parse(text: &str) -> Result<Automaton, FormatError> {
    read(text.as_bytes())
}

/// Reads an automaton from a file.
pub fn read_path(path: impl AsRef<Path>) -> Result<Automaton, FormatError> {
    let file = File::open(path)?;
    read(BufReader::new(file))
}

/// Writes the canonical representation of `fsa`. Performs no validation;
/// fails only if the sink does.
pub fn write<W: Write>(fsa: &Automaton, mut writer: W) -> io::Result<()> {
    for (_, state) in fsa.states() {
        let position = state.position();
        writeln!(
            writer,
            "{}",
            Record::State {
                name: state.name(),
                x: position.x,
                y: position.y,
            }
        )?;
    }
    for (_, transition) in fsa.transitions() {
        writeln!(
            writer,
            "{}",
            Record::Transition {
                from: fsa.state_name(transition.from()),
                event: transition.event(),
                to: fsa.state_name(transition.to()),
            }
        )?;
    }
    for id in fsa.initial_states() {
        writeln!(writer, "{}", Record::Initial { name: fsa.state_name(id) })?;
    }
    for id in fsa.final_states() {
        writeln!(writer, "{}", Record::Final { name: fsa.state_name(id) })?;
    }
    writer.flush()
}

/// Writes `fsa` to a file, replacing its contents.
pub fn write_path(fsa: &Automaton, path: impl AsRef<Path>) -> io::Result<()> {
    let file = File::create(path)?;
    write(fsa, BufWriter::new(file))
}

/// Canonical representation of `fsa` as a string.
pub fn to_string(fsa: &Automaton) -> String {
    let mut buf = Vec::new();
    // Writing to a Vec cannot fail.
    let _ = write(fsa, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}
