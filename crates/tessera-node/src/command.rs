//! Interactive command parsing.

use std::{fmt, str::FromStr};

/// One line typed at the principal prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `connect <name>`
    Connect(String),
    /// `sessions`
    Sessions,
    /// `exit`
    Exit,
    /// Blank line
    Empty,
}

/// Input that is not a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageError(pub String);

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{USAGE}", self.0)
    }
}

/// Help text printed for unknown input
pub const USAGE: &str = "commands:\n  connect <name>\n  sessions\n  exit";

impl FromStr for Command {
    type Err = UsageError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(Self::Empty);
        };
        let argument = words.next();
        if words.next().is_some() {
            return Err(UsageError("too many arguments".to_string()));
        }

        match (verb, argument) {
            ("connect", Some(name)) => Ok(Self::Connect(name.to_string())),
            ("connect", None) => Err(UsageError("usage: connect <name>".to_string())),
            ("sessions", None) => Ok(Self::Sessions),
            ("exit" | "quit", None) => Ok(Self::Exit),
            ("sessions" | "exit" | "quit", Some(_)) => {
                Err(UsageError(format!("{verb} takes no arguments")))
            },
            _ => Err(UsageError(format!("unknown command: {verb}"))),
        }
    }
}
