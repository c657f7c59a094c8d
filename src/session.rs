//! A numbered collection of set versions driven by the command protocol.
//!
//! A session starts with one empty version, `0`. Inserting into a version
//! that does not exist yet grows the collection with empty versions up to it;
//! every other command that names a missing version is rejected with
//! [`SessionError::UnknownVersion`], except membership tests, which simply
//! answer `false`.
//!
//! The session also tracks a single cursor: the last key successfully
//! inserted or found. Commands `5` and `6` walk it through the keys of the
//! version it points into.

pub mod command;

use std::error::Error;
use std::fmt;
use std::io::{BufRead, Write};

pub use command::{Command, CommandReader, Reply};

use crate::set::{Forest, ForestConfig, VersionedSet};

/// Default upper bound on the number of versions a session may hold.
pub const DEFAULT_MAX_VERSIONS: usize = 1 << 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub forest: ForestConfig,
    /// Commands that would grow the session past this many versions fail
    /// with [`SessionError::VersionLimit`].
    pub max_versions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            forest: ForestConfig::default(),
            max_versions: DEFAULT_MAX_VERSIONS,
        }
    }
}

#[derive(Debug)]
pub enum SessionError {
    UnknownVersion { version: i64, versions: usize },
    VersionLimit { requested: usize, limit: usize },
    UnknownOpcode(i64),
    InvalidToken(String),
    MissingArgument { opcode: i64 },
    Io(std::io::Error),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::UnknownVersion { version, versions } => write!(
                f,
                "version {version} does not exist (the session holds {versions} versions)"
            ),
            SessionError::VersionLimit { requested, limit } => write!(
                f,
                "{requested} versions requested but at most {limit} are allowed"
            ),
            SessionError::UnknownOpcode(opcode) => write!(f, "unknown opcode {opcode}"),
            SessionError::InvalidToken(token) => write!(f, "expected an integer, found {token:?}"),
            SessionError::MissingArgument { opcode } => {
                write!(f, "input ended inside a command with opcode {opcode}")
            }
            SessionError::Io(err) => write!(f, "i/o error: {err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SessionError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::Io(err)
    }
}

/// Position of the traversal cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub version: usize,
    pub key: i64,
}

pub struct Session {
    forest: Forest,
    versions: Vec<VersionedSet>,
    cursor: Option<Cursor>,
    max_versions: usize,
}

impl Session {
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        let forest = Forest::with_config(config.forest);
        let versions = vec![forest.set()];
        Session {
            forest,
            versions,
            cursor: None,
            max_versions: config.max_versions.max(1),
        }
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn versions(&self) -> &[VersionedSet] {
        &self.versions
    }

    pub fn version(&self, version: usize) -> Option<&VersionedSet> {
        self.versions.get(version)
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.cursor
    }

    fn resolve(&self, version: i64) -> Result<usize, SessionError> {
        usize::try_from(version)
            .ok()
            .filter(|&index| index < self.versions.len())
            .ok_or(SessionError::UnknownVersion {
                version,
                versions: self.versions.len(),
            })
    }

    /// Makes sure `version` exists, appending empty versions as needed.
    fn grow_to(&mut self, version: i64) -> Result<usize, SessionError> {
        let index = usize::try_from(version).map_err(|_| SessionError::UnknownVersion {
            version,
            versions: self.versions.len(),
        })?;
        if index >= self.versions.len() {
            let requested = index.saturating_add(1);
            if requested > self.max_versions {
                return Err(SessionError::VersionLimit {
                    requested,
                    limit: self.max_versions,
                });
            }
            let forest = &self.forest;
            self.versions.resize_with(requested, || forest.set());
        }
        Ok(index)
    }

    /// Runs one command. Commands that produce output return their [`Reply`].
    ///
    /// A rejected command leaves the session untouched.
    pub fn execute(&mut self, command: Command) -> Result<Option<Reply>, SessionError> {
        tracing::trace!(%command, "execute");
        let reply = match command {
            Command::Insert { version, key } => {
                let index = self.grow_to(version)?;
                if self.versions[index].emplace(key) {
                    self.cursor = Some(Cursor {
                        version: index,
                        key,
                    });
                }
                None
            }
            Command::Erase { version, key } => {
                let index = self.resolve(version)?;
                if self.cursor == Some(Cursor { version: index, key }) {
                    self.cursor = None;
                }
                self.versions[index].erase(key);
                None
            }
            Command::Snapshot { version } => {
                let index = self.resolve(version)?;
                if self.versions.len() >= self.max_versions {
                    return Err(SessionError::VersionLimit {
                        requested: self.versions.len() + 1,
                        limit: self.max_versions,
                    });
                }
                let snapshot = self.versions[index].clone();
                self.versions.push(snapshot);
                tracing::debug!(
                    source = index,
                    version = self.versions.len() - 1,
                    "snapshot created"
                );
                None
            }
            Command::Contains { version, key } => {
                let hit = self
                    .resolve(version)
                    .ok()
                    .filter(|&index| self.versions[index].contains(key));
                if let Some(index) = hit {
                    self.cursor = Some(Cursor {
                        version: index,
                        key,
                    });
                }
                Some(Reply::Member(hit.is_some()))
            }
            Command::Range { version, low, high } => {
                let index = self.resolve(version)?;
                Some(Reply::Count(self.versions[index].range(low, high)))
            }
            Command::Prev => Some(Reply::Key(self.step(false))),
            Command::Next => Some(Reply::Key(self.step(true))),
        };
        Ok(reply)
    }

    /// Moves the cursor to the neighbouring key, dropping it when there is none.
    fn step(&mut self, forward: bool) -> Option<i64> {
        let cursor = self.cursor?;
        let set = &self.versions[cursor.version];
        let next = if forward {
            set.successor(cursor.key)
        } else {
            set.predecessor(cursor.key)
        };
        debug_assert!(next.map_or(true, |key| (key > cursor.key) == forward));
        self.cursor = next.map(|key| Cursor {
            version: cursor.version,
            key,
        });
        next
    }

    /// Executes every command in `input`, writing one line per reply.
    ///
    /// Stops at the first rejected command. Returns the number of executed
    /// commands.
    pub fn run<R, W>(&mut self, input: R, mut output: W) -> Result<usize, SessionError>
    where
        R: BufRead,
        W: Write,
    {
        let mut executed = 0;
        for command in CommandReader::new(input) {
            let outcome = command.and_then(|command| self.execute(command));
            match outcome {
                Ok(Some(reply)) => writeln!(output, "{reply}")?,
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(command = executed + 1, %err, "command rejected");
                    output.flush()?;
                    return Err(err);
                }
            }
            executed += 1;
        }
        output.flush()?;
        Ok(executed)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
