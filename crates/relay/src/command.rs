//! Operator commands bound for the scheduler.
//!
//! The relay does not interpret command text (`set:tickets:42`,
//! `spawn:green:8`, ...); the scheduler owns that grammar. The only rule
//! enforced here is that a command fits on one line, since a line break
//! would split it into two upstream records.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("command contains a line break at byte {0}")]
    LineBreak(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command(String);

impl Command {
    pub fn new(raw: impl Into<String>) -> Result<Self, CommandError> {
        let raw = raw.into();
        if let Some(at) = raw.find(|c: char| c == '\n' || c == '\r') {
            return Err(CommandError::LineBreak(at));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wire form: the command text followed by exactly one `\n`.
    pub fn to_line(&self) -> Vec<u8> {
        let mut line = Vec::with_capacity(self.0.len() + 1);
        line.extend_from_slice(self.0.as_bytes());
        line.push(b'\n');
        line
    }
}

impl TryFrom<String> for Command {
    type Error = CommandError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl TryFrom<&str> for Command {
    type Error = CommandError;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_single_newline() {
        let cmd = Command::new("set:tickets:42").unwrap();
        assert_eq!(cmd.to_line(), b"set:tickets:42\n");
    }

    #[test]
    fn text_is_carried_verbatim() {
        let cmd = Command::try_from("spawn:matrix:  64 :4").unwrap();
        assert_eq!(cmd.as_str(), "spawn:matrix:  64 :4");
        assert_eq!(cmd.to_string(), "spawn:matrix:  64 :4");
    }

    #[test]
    fn rejects_embedded_newline() {
        assert_eq!(
            Command::new("set:slice:5\nspawn:green:1"),
            Err(CommandError::LineBreak(11))
        );
    }

    #[test]
    fn rejects_carriage_return() {
        assert_eq!(Command::new("a\r"), Err(CommandError::LineBreak(1)));
    }

    #[test]
    fn empty_command_is_one_empty_line() {
        let cmd = Command::new("").unwrap();
        assert_eq!(cmd.to_line(), b"\n");
    }
}
