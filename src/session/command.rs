//! Wire format of the session protocol.
//!
//! Input is a stream of whitespace separated integers. Each command starts
//! with its opcode followed by a fixed number of integer arguments; line
//! breaks carry no meaning.

use std::fmt;
use std::io::BufRead;

use super::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `0 a b`: insert `key` into `version`, creating missing versions.
    Insert { version: i64, key: i64 },
    /// `1 a b`: erase `key` from `version`.
    Erase { version: i64, key: i64 },
    /// `2 a`: append a snapshot of `version`.
    Snapshot { version: i64 },
    /// `3 a b`: test membership of `key` in `version`.
    Contains { version: i64, key: i64 },
    /// `4 a b c`: count the keys of `version` in `low..=high`.
    Range { version: i64, low: i64, high: i64 },
    /// `5`: step the cursor to the previous key.
    Prev,
    /// `6`: step the cursor to the next key.
    Next,
}

impl Command {
    pub fn opcode(&self) -> i64 {
        match self {
            Command::Insert { .. } => 0,
            Command::Erase { .. } => 1,
            Command::Snapshot { .. } => 2,
            Command::Contains { .. } => 3,
            Command::Range { .. } => 4,
            Command::Prev => 5,
            Command::Next => 6,
        }
    }

    /// Number of integer arguments following `opcode`.
    pub fn arity(opcode: i64) -> Option<usize> {
        match opcode {
            0 | 1 | 3 => Some(2),
            2 => Some(1),
            4 => Some(3),
            5 | 6 => Some(0),
            _ => None,
        }
    }

    fn from_parts(opcode: i64, args: &[i64]) -> Command {
        match (opcode, args) {
            (0, &[version, key]) => Command::Insert { version, key },
            (1, &[version, key]) => Command::Erase { version, key },
            (2, &[version]) => Command::Snapshot { version },
            (3, &[version, key]) => Command::Contains { version, key },
            (4, &[version, low, high]) => Command::Range { version, low, high },
            (5, &[]) => Command::Prev,
            (6, &[]) => Command::Next,
            _ => unreachable!("arity table and command table disagree"),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode())?;
        match *self {
            Command::Insert { version, key }
            | Command::Erase { version, key }
            | Command::Contains { version, key } => write!(f, " {version} {key}"),
            Command::Snapshot { version } => write!(f, " {version}"),
            Command::Range { version, low, high } => write!(f, " {version} {low} {high}"),
            Command::Prev | Command::Next => Ok(()),
        }
    }
}

/// Output of a command that produces one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Member(bool),
    Count(usize),
    /// The key the cursor moved to, `None` once it fell off the set.
    Key(Option<i64>),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Member(found) => write!(f, "{found}"),
            Reply::Count(count) => write!(f, "{count}"),
            Reply::Key(Some(key)) => write!(f, "{key}"),
            Reply::Key(None) => f.write_str("-1"),
        }
    }
}

/// Streams [`Command`]s out of a reader.
pub struct CommandReader<R> {
    input: R,
    line: String,
    tokens: std::vec::IntoIter<String>,
}

impl<R: BufRead> CommandReader<R> {
    pub fn new(input: R) -> Self {
        CommandReader {
            input,
            line: String::new(),
            tokens: Vec::new().into_iter(),
        }
    }

    fn next_int(&mut self) -> Result<Option<i64>, SessionError> {
        loop {
            if let Some(token) = self.tokens.next() {
                return token
                    .parse()
                    .map(Some)
                    .map_err(|_| SessionError::InvalidToken(token));
            }
            self.line.clear();
            if self.input.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            self.tokens = self
                .line
                .split_whitespace()
                .map(str::to_owned)
                .collect::<Vec<_>>()
                .into_iter();
        }
    }

    fn read_command(&mut self) -> Result<Option<Command>, SessionError> {
        let Some(opcode) = self.next_int()? else {
            return Ok(None);
        };
        let arity = Command::arity(opcode).ok_or(SessionError::UnknownOpcode(opcode))?;
        let mut args = [0i64; 3];
        for arg in &mut args[..arity] {
            *arg = self
                .next_int()?
                .ok_or(SessionError::MissingArgument { opcode })?;
        }
        Ok(Some(Command::from_parts(opcode, &args[..arity])))
    }
}

impl<R: BufRead> Iterator for CommandReader<R> {
    type Item = Result<Command, SessionError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_command().transpose()
    }
}

/// Strategies producing command streams for property tests.
#[cfg(feature = "proptest")]
pub mod strategy {
    use super::Command;
    use proptest::prelude::*;
    use std::ops::Range;

    /// A single command touching versions `0..versions` and keys in `keys`.
    ///
    /// Version arguments are drawn independently of what a session has
    /// created so far, so streams also exercise growth and rejection.
    pub fn command(versions: i64, keys: Range<i64>) -> impl Strategy<Value = Command> {
        let version = 0..versions.max(1);
        prop_oneof![
            4 => (version.clone(), keys.clone())
                .prop_map(|(version, key)| Command::Insert { version, key }),
            2 => (version.clone(), keys.clone())
                .prop_map(|(version, key)| Command::Erase { version, key }),
            1 => version.clone().prop_map(|version| Command::Snapshot { version }),
            2 => (version.clone(), keys.clone())
                .prop_map(|(version, key)| Command::Contains { version, key }),
            1 => (version, keys.clone(), keys)
                .prop_map(|(version, low, high)| Command::Range { version, low, high }),
            1 => Just(Command::Prev),
            1 => Just(Command::Next),
        ]
    }

    pub fn commands(
        versions: i64,
        keys: Range<i64>,
        len: Range<usize>,
    ) -> impl Strategy<Value = Vec<Command>> {
        prop::collection::vec(command(versions, keys), len)
    }
}
