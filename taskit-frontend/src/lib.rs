//! The TaskIt frontend client (`spec.md` §4.3): a registry of backends with
//! least-loaded selection and failover, synchronous `work`, asynchronous
//! `callback`/`ignore`, and administrative signal transmission.

use std::collections::HashMap;
use std::io;
use std::net::TcpStream;
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::{json, Value};

use taskit_core::config::{BackendAddr, FrontendConfig};
use taskit_core::task::{Args, KwArgs, Response, TaskName, KILL, STATUS, STOP};
use taskit_core::{BackendError, Codec, Frame, JsonCodec, Logger, TaskError};

#[derive(Debug, Clone, Default)]
struct Counters {
    in_flight: u64,
    lifetime: u64,
}

struct Shared {
    codec: Box<dyn Codec>,
    frame: Frame,
    log: Logger,
    default_port: u16,
    registry: Mutex<HashMap<(String, u16), Counters>>,
}

/// The frontend dispatcher. Cheap to clone; clones share the same backend
/// registry and counters, which is what lets `callback`/`ignore` dispatch
/// threads observe the same state as the caller.
#[derive(Clone)]
pub struct Frontend {
    inner: Arc<Shared>,
}

impl Frontend {
    pub fn new(config: FrontendConfig) -> Self {
        let mut registry = HashMap::new();
        for addr in &config.backends {
            let (host, port) = addr.resolve(config.default_port);
            registry.insert((host, port), Counters::default());
        }
        Frontend {
            inner: Arc::new(Shared {
                codec: Box::new(JsonCodec),
                frame: Frame::new(config.data_size),
                log: Logger::null(),
                default_port: config.default_port,
                registry: Mutex::new(registry),
            }),
        }
    }

    pub fn with_logger(mut self, log: Logger) -> Self {
        Arc::get_mut(&mut self.inner)
            .expect("with_logger must be called before the frontend is cloned")
            .log = log;
        self
    }

    pub fn with_codec(mut self, codec: impl Codec + 'static) -> Self {
        Arc::get_mut(&mut self.inner)
            .expect("with_codec must be called before the frontend is cloned")
            .codec = Box::new(codec);
        self
    }

    /// Register one more backend. Accepts a bare host (paired with
    /// `default_port`) or an explicit `(host, port)` (`spec.md` §4.3 "Host
    /// normalization").
    pub fn add_backend(&self, addr: BackendAddr) {
        let (host, port) = addr.resolve(self.inner.default_port);
        self.inner
            .registry
            .lock()
            .unwrap()
            .entry((host, port))
            .or_insert_with(Counters::default);
    }

    fn is_registered(&self, backend: &(String, u16)) -> bool {
        self.inner.registry.lock().unwrap().contains_key(backend)
    }

    /// Backends sorted ascending by current `in_flight`, ties broken by
    /// iteration order (`spec.md` §4.3 step 2 — acceptable per the spec since
    /// the selection is a hint, not a reservation).
    fn candidates(&self) -> Vec<(String, u16)> {
        let registry = self.inner.registry.lock().unwrap();
        let mut entries: Vec<_> = registry
            .iter()
            .map(|(addr, counters)| (addr.clone(), counters.in_flight))
            .collect();
        entries.sort_by_key(|(_, in_flight)| *in_flight);
        entries.into_iter().map(|(addr, _)| addr).collect()
    }

    /// Synchronous dispatch with least-loaded selection and failover
    /// (`spec.md` §4.3, invariants 4–5 in §8). Only a socket-level connection
    /// failure triggers failover to the next candidate; a reply that arrives
    /// but is malformed is a protocol error and propagates instead of being
    /// masked by a retry against a different backend (`spec.md` §4.3 step 3,
    /// "On any other error, propagate").
    pub fn work(&self, task: &str, args: Args, kwargs: KwArgs) -> Result<Value, BackendError> {
        let package = self.inner.codec.encode(&json!((task, args, kwargs)));

        for backend in self.candidates() {
            match self.try_once(&backend, &package) {
                Ok(value) => return Ok(value),
                Err(AttemptError::Connection(_)) => continue,
                Err(AttemptError::Protocol(msg)) => {
                    return Err(BackendError::Processing(TaskError::new(
                        "ProtocolError",
                        vec![json!(msg)],
                    )))
                }
                Err(AttemptError::Backend(e)) => return Err(e),
            }
        }
        Err(BackendError::NoBackendsAvailable)
    }

    /// The `_work` primitive: one fresh connection per call, counters
    /// adjusted per `spec.md` §4.3's `_work` algorithm. A failure to connect
    /// or send decrements both counters, "this attempt didn't count"; once
    /// the request has actually reached the backend — a reply received
    /// (success or error envelope) or a protocol-level failure reading it
    /// back — only `in_flight` is decremented, since `lifetime` already
    /// reflects a completed attempt (§4.3 steps 4–5).
    fn try_once(&self, backend: &(String, u16), package: &[u8]) -> Result<Value, AttemptError> {
        self.bump_counters(backend);

        let outcome = self.attempt(backend, package);

        match &outcome {
            Err(AttemptError::Connection(_)) => self.finish_failure(backend),
            _ => self.finish_success(backend),
        }

        outcome
    }

    fn bump_counters(&self, backend: &(String, u16)) {
        let mut registry = self.inner.registry.lock().unwrap();
        let counters = registry.entry(backend.clone()).or_insert_with(Counters::default);
        counters.in_flight += 1;
        counters.lifetime += 1;
    }

    fn finish_success(&self, backend: &(String, u16)) {
        let mut registry = self.inner.registry.lock().unwrap();
        if let Some(counters) = registry.get_mut(backend) {
            counters.in_flight = counters.in_flight.saturating_sub(1);
        }
    }

    /// Decrements *both* counters — "this attempt didn't count" (`spec.md`
    /// §4.3 step 4).
    fn finish_failure(&self, backend: &(String, u16)) {
        let mut registry = self.inner.registry.lock().unwrap();
        if let Some(counters) = registry.get_mut(backend) {
            counters.in_flight = counters.in_flight.saturating_sub(1);
            counters.lifetime = counters.lifetime.saturating_sub(1);
        }
    }

    fn attempt(&self, backend: &(String, u16), package: &[u8]) -> Result<Value, AttemptError> {
        let mut stream =
            TcpStream::connect((backend.0.as_str(), backend.1)).map_err(AttemptError::Connection)?;

        self.inner
            .frame
            .send(&mut stream, package)
            .map_err(AttemptError::Connection)?;
        let reply_bytes = self
            .inner
            .frame
            .recv(&mut stream)
            .map_err(|e| AttemptError::Protocol(format!("framing error: {e}")))?;
        let reply_value = self
            .inner
            .codec
            .decode(&reply_bytes)
            .map_err(|e| AttemptError::Protocol(format!("decode error: {e}")))?;

        match Response::try_from_value(&reply_value) {
            Ok(Response::Success(value)) => Ok(value),
            Ok(Response::Error(name, args)) => {
                Err(AttemptError::Backend(BackendError::Processing(TaskError::new(name, args))))
            }
            Err(e) => Err(AttemptError::Protocol(format!("malformed response envelope: {e}"))),
        }
    }

    /// Fire-and-forget dispatch with no callback at all — `ignore` from
    /// `spec.md` §4.3, built on [`Frontend::callback`] with a no-op success
    /// callback and the silently-drop error sentinel.
    pub fn ignore(&self, task: impl Into<TaskName>, args: Args, kwargs: KwArgs) {
        self.callback(task, args, kwargs, |_| {}, ErrorCallback::Ignore);
    }

    /// Asynchronous dispatch: spawns a worker thread that performs `work`
    /// and then invokes `success` or dispatches to `on_error` (`spec.md`
    /// §4.3).
    pub fn callback<S>(
        &self,
        task: impl Into<TaskName>,
        args: Args,
        kwargs: KwArgs,
        success: S,
        on_error: ErrorCallback,
    ) where
        S: FnOnce(Value) + Send + 'static,
    {
        let frontend = self.clone();
        let task = task.into();
        thread::spawn(move || match frontend.work(&task, args, kwargs) {
            Ok(value) => success(value),
            Err(e) => match on_error {
                ErrorCallback::Log => frontend.inner.log.error(&format!("task {task} failed: {e}")),
                ErrorCallback::Ignore => {}
                ErrorCallback::Handle(handler) => (*handler)(e),
            },
        });
    }

    /// Send `<stop>` to `backend`, with logging suppressed the way admin
    /// signals are in the original (`spec.md` §4.3 "Administrative
    /// signals").
    pub fn send_stop(&self, backend: &(String, u16)) -> Result<Value, BackendError> {
        self.send_signal(backend, STOP)
    }

    pub fn send_kill(&self, backend: &(String, u16)) -> Result<Value, BackendError> {
        self.send_signal(backend, KILL)
    }

    /// `<status>`: `"down"` if unreachable, otherwise the backend's reply
    /// (a decimal digit string when up). An unregistered backend is a
    /// caller error, not a "down" backend, so it propagates as
    /// `BackendError::UnknownBackend` instead of being folded into `"down"`
    /// (`spec.md` §4.3: `get_tasks` reports "down" for unreachable;
    /// `send_signal` raises separately for not-in-registry).
    pub fn get_tasks(&self, backend: &(String, u16)) -> Result<String, BackendError> {
        if !self.is_registered(backend) {
            return Err(BackendError::UnknownBackend);
        }
        match self.send_signal(backend, STATUS) {
            Ok(value) => Ok(value.as_str().unwrap_or_default().to_string()),
            Err(_) => Ok("down".to_string()),
        }
    }

    fn send_signal(&self, backend: &(String, u16), name: &str) -> Result<Value, BackendError> {
        if !self.is_registered(backend) {
            return Err(BackendError::UnknownBackend);
        }
        let package = self.inner.codec.encode(&json!((name, Vec::<Value>::new(), {})));
        match self.try_once(backend, &package) {
            Ok(value) => Ok(value),
            Err(AttemptError::Connection(e)) => {
                Err(BackendError::Processing(TaskError::new("ConnectionError", vec![json!(e.to_string())])))
            }
            Err(AttemptError::Protocol(msg)) => {
                Err(BackendError::Processing(TaskError::new("ProtocolError", vec![json!(msg)])))
            }
            Err(AttemptError::Backend(e)) => Err(e),
        }
    }
}

enum AttemptError {
    Connection(io::Error),
    Protocol(String),
    Backend(BackendError),
}

/// What to do with a `BackendError` raised by a [`Frontend::callback`]
/// dispatch, mirroring the three-way `error_cb` contract in `spec.md` §4.3.
pub enum ErrorCallback {
    Log,
    Ignore,
    Handle(Arc<dyn Fn(BackendError) + Send + Sync>),
}

impl ErrorCallback {
    pub fn handle(f: impl Fn(BackendError) + Send + Sync + 'static) -> Self {
        ErrorCallback::Handle(Arc::new(f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(backends: Vec<BackendAddr>, default_port: u16) -> FrontendConfig {
        FrontendConfig {
            backends,
            default_port,
            data_size: 2048,
        }
    }

    #[test]
    fn unregistered_backend_is_rejected() {
        let frontend = Frontend::new(cfg(vec![], 54543));
        let err = frontend.send_stop(&("127.0.0.1".to_string(), 1)).unwrap_err();
        assert!(matches!(err, BackendError::UnknownBackend));
    }

    #[test]
    fn unreachable_backend_reports_no_backends_available() {
        let frontend = Frontend::new(cfg(vec![BackendAddr::HostPort("127.0.0.1".into(), 1)], 54543));
        let err = frontend.work("add", vec![], serde_json::Map::new()).unwrap_err();
        assert!(matches!(err, BackendError::NoBackendsAvailable));
    }

    #[test]
    fn candidates_are_sorted_by_in_flight() {
        let frontend = Frontend::new(cfg(
            vec![
                BackendAddr::HostPort("a".into(), 1),
                BackendAddr::HostPort("b".into(), 2),
            ],
            54543,
        ));
        frontend.bump_counters(&("b".to_string(), 2));
        let candidates = frontend.candidates();
        assert_eq!(candidates[0], ("a".to_string(), 1));
    }
}
