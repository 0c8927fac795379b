//! Codec interface (`spec.md` §1, §6): external to the core, but the core
//! assumes a total `encode(value) -> bytes` / `decode(bytes) -> value` pair
//! over a JSON-like value domain. `serde_json::Value` is that domain.

use serde_json::Value;

/// Failure while decoding a peer's bytes back into a [`Value`].
pub type CodecError = serde_json::Error;

/// A total encode/decode pair over the JSON value domain. Implementations
/// are expected to be infallible on encode — every [`Value`] is
/// representable — but decode can fail on malformed input from the wire.
pub trait Codec: Send + Sync {
    fn encode(&self, value: &Value) -> Vec<u8>;
    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError>;
}

/// The default codec: plain JSON, matching `taskit.common.JSONCodec` in the
/// original implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, value: &Value) -> Vec<u8> {
        // A `serde_json::Value` can always be serialized; the only failure
        // mode of `serde_json::to_vec` is a writer error, which a `Vec` never
        // produces.
        serde_json::to_vec(value).expect("serde_json::Value serialization is infallible")
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        serde_json::from_slice(bytes)
    }
}
