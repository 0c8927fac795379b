//! Wire envelopes and task registration types (`spec.md` §3, §9).

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::TaskError;

/// A registered task's name.
pub type TaskName = String;
/// Positional arguments, JSON-serializable.
pub type Args = Vec<Value>;
/// Keyword arguments: a string-keyed JSON-serializable mapping.
pub type KwArgs = Map<String, Value>;

/// The request envelope: an ordered triple `[task_name, positional_args, keyword_args]`.
/// `serde_json` serializes a Rust tuple as a JSON array, so this is already
/// wire-compatible without a custom `Serialize` impl.
pub type Request = (TaskName, Args, KwArgs);

/// Reserved admin task names (`spec.md` §6). Treated as ordinary registered
/// tasks at the wire level; only the registration side distinguishes them.
pub const STOP: &str = "<stop>";
pub const KILL: &str = "<kill>";
pub const STATUS: &str = "<status>";

/// Default TCP port for a backend (`spec.md` §6).
pub const DEFAULT_PORT: u16 = 54543;

/// The response envelope: either `["success", value]` or
/// `["error", error_name, error_args]` (`spec.md` §3, invariant #3 in §8).
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Success(Value),
    Error(String, Vec<Value>),
}

impl Response {
    pub fn success(value: Value) -> Self {
        Response::Success(value)
    }

    pub fn from_task_error(e: &TaskError) -> Self {
        Response::Error(e.name.clone(), e.args.clone())
    }

    /// Render this envelope to the wire's `Value` shape.
    pub fn to_value(&self) -> Value {
        match self {
            Response::Success(v) => Value::Array(vec![Value::String("success".into()), v.clone()]),
            Response::Error(name, args) => Value::Array(vec![
                Value::String("error".into()),
                Value::String(name.clone()),
                Value::Array(args.clone()),
            ]),
        }
    }

    /// Parse a decoded `Value` back into a `Response`, enforcing the
    /// 2-or-3-element shape invariant.
    pub fn try_from_value(value: &Value) -> Result<Response, EnvelopeError> {
        let items = value.as_array().ok_or(EnvelopeError::NotAnArray)?;
        match items.first().and_then(Value::as_str) {
            Some("success") if items.len() == 2 => Ok(Response::Success(items[1].clone())),
            Some("error") if items.len() == 3 => {
                let name = items[1].as_str().ok_or(EnvelopeError::BadShape)?.to_string();
                let args = items[2].as_array().ok_or(EnvelopeError::BadShape)?.clone();
                Ok(Response::Error(name, args))
            }
            _ => Err(EnvelopeError::BadShape),
        }
    }
}

/// The response envelope did not match one of the two shapes the protocol
/// allows.
#[derive(Debug)]
pub enum EnvelopeError {
    NotAnArray,
    BadShape,
}

impl fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvelopeError::NotAnArray => write!(f, "response envelope was not a JSON array"),
            EnvelopeError::BadShape => write!(
                f,
                "response envelope was neither [\"success\", v] nor [\"error\", name, args]"
            ),
        }
    }
}

impl std::error::Error for EnvelopeError {}

/// A task callable. Tasks either take no handle (`Plain`) or receive the
/// owning backend handle `H` as their first positional argument
/// (`WithBackend`), mirroring the `pass_backend` flag in the original
/// `tasks: name -> (callable, pass_backend)` registry (`spec.md` §3, §9).
#[derive(Clone)]
pub enum TaskEntry<H> {
    Plain(Arc<dyn Fn(Args, KwArgs) -> Result<Value, TaskError> + Send + Sync>),
    WithBackend(Arc<dyn Fn(&H, Args, KwArgs) -> Result<Value, TaskError> + Send + Sync>),
}

impl<H> fmt::Debug for TaskEntry<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskEntry::Plain(_) => f.write_str("TaskEntry::Plain(..)"),
            TaskEntry::WithBackend(_) => f.write_str("TaskEntry::WithBackend(..)"),
        }
    }
}

impl<H> TaskEntry<H> {
    pub fn plain<F>(f: F) -> Self
    where
        F: Fn(Args, KwArgs) -> Result<Value, TaskError> + Send + Sync + 'static,
    {
        TaskEntry::Plain(Arc::new(f))
    }

    pub fn with_backend<F>(f: F) -> Self
    where
        F: Fn(&H, Args, KwArgs) -> Result<Value, TaskError> + Send + Sync + 'static,
    {
        TaskEntry::WithBackend(Arc::new(f))
    }
}
