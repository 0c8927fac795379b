//! Error taxonomy shared by the backend and frontend.
//!
//! Follows the teacher's own style (`flux::shared::NetworkError`): plain
//! enums with manual `Display`/`Error` impls and manual `From` conversions,
//! no `thiserror`/`anyhow`.

use std::fmt;
use std::io;

use serde_json::Value;

/// Errors raised by the framing layer (`spec.md` §4.1, §7 item 1).
#[derive(Debug)]
pub enum FramingError {
    /// A segment header's continuation byte was not `'0'`/`'1'`, or a read
    /// returned zero bytes mid-segment.
    Corruption,
    /// Any other I/O failure while reading or writing a segment.
    Io(io::Error),
}

impl fmt::Display for FramingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FramingError::Corruption => {
                write!(f, "First Bytes protocol corruption: bad segment header")
            }
            FramingError::Io(e) => write!(f, "I/O error while framing a message: {e}"),
        }
    }
}

impl std::error::Error for FramingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FramingError::Corruption => None,
            FramingError::Io(e) => Some(e),
        }
    }
}

impl From<io::Error> for FramingError {
    fn from(e: io::Error) -> Self {
        FramingError::Io(e)
    }
}

/// A backend task failure, carried faithfully from the task's exception class
/// name and arguments to the wire (`spec.md` §3, §7 item 3).
#[derive(Debug, Clone, PartialEq)]
pub struct TaskError {
    pub name: String,
    pub args: Vec<Value>,
}

impl TaskError {
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        TaskError {
            name: name.into(),
            args,
        }
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", self.name, self.args)
    }
}

impl std::error::Error for TaskError {}

/// Errors observed by the frontend while dispatching a task (`spec.md` §7).
#[derive(Debug)]
pub enum BackendError {
    /// The backend ran the task and it raised; carries the reported error
    /// faithfully.
    Processing(TaskError),
    /// Every registered backend failed to connect.
    NoBackendsAvailable,
    /// `send_signal`/`get_tasks` referenced a backend that was never
    /// registered.
    UnknownBackend,
    /// A `Mediator`/`Resyncer` wait expired.
    Resync(ResyncError),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Processing(e) => write!(f, "backend task failed: {e}"),
            BackendError::NoBackendsAvailable => write!(f, "no registered backend was reachable"),
            BackendError::UnknownBackend => write!(f, "No such backend!"),
            BackendError::Resync(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for BackendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BackendError::Processing(e) => Some(e),
            BackendError::Resync(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors raised by the [`crate::resync`] rendezvous primitive.
#[derive(Debug)]
pub enum ResyncError {
    Timeout,
}

impl fmt::Display for ResyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResyncError::Timeout => {
                write!(f, "could not acquire the mediator result within the time allotted")
            }
        }
    }
}

impl std::error::Error for ResyncError {}

impl From<ResyncError> for BackendError {
    fn from(e: ResyncError) -> Self {
        BackendError::Resync(e)
    }
}
