//! Shared types for the TaskIt distributed task-dispatch system: the First
//! Bytes framing protocol, the codec interface, the wire envelopes, the
//! error taxonomy, the logger abstraction, the resync rendezvous, the
//! port-range parser, and a local (non-distributed) task wrapper.

pub mod codec;
pub mod config;
pub mod error;
pub mod framing;
pub mod local;
pub mod logging;
pub mod portrange;
pub mod resync;
pub mod task;

pub use codec::{Codec, CodecError, JsonCodec};
pub use error::{BackendError, FramingError, ResyncError, TaskError};
pub use framing::Frame;
pub use logging::{Level, Logger};
pub use resync::{GetError, Mediator, Resyncer};
pub use task::{Args, KwArgs, Request, Response, TaskEntry, TaskName, DEFAULT_PORT};
