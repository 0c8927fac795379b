//! The TaskIt backend server (`spec.md` §4.2): an accept loop that dispatches
//! each connection to a named task in its own thread, with in-flight
//! bookkeeping and in-band administrative signals.

use std::collections::HashMap;
use std::io;
use std::net::{TcpListener, TcpStream};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread;
use std::time::Duration;

use serde_json::Value;

use taskit_core::config::BackendConfig;
use taskit_core::task::{Args, KwArgs, Request, TaskEntry, TaskName, KILL, STATUS, STOP};
use taskit_core::{Codec, Frame, JsonCodec, Logger, Response, TaskError};

type Registry = HashMap<TaskName, TaskEntry<Backend>>;

struct Shared {
    host: String,
    port: u16,
    tasks: RwLock<Registry>,
    codec: Box<dyn Codec>,
    frame: Frame,
    log: Logger,
    in_flight: Mutex<u64>,
    stop: AtomicBool,
    terminate: AtomicBool,
    end_resp: Duration,
}

/// A running (or not-yet-started) backend. Cheap to clone — every clone
/// shares the same registry, counters and shutdown flags, which is what lets
/// admin tasks and handler threads observe and mutate the same state (`spec.md`
/// §5 "shared state and locking").
#[derive(Clone)]
pub struct Backend {
    inner: Arc<Shared>,
}

/// RAII in-flight accounting. Held for the duration of a task's execution;
/// decrements unconditionally on drop, including on an early return or panic
/// unwind, which is how the counter-conservation invariant (`spec.md` §8.1)
/// is kept without a manual `finally`. Also handed out by
/// [`Backend::subtask`] for tasks that themselves spawn worker threads and
/// need to keep the parent counter balanced across that handoff.
pub struct TaskGuard {
    shared: Arc<Shared>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        let mut n = self.shared.in_flight.lock().unwrap();
        *n = n.saturating_sub(1);
    }
}

impl Backend {
    /// Build a backend from on-disk configuration. Registers the three admin
    /// tasks (`<stop>`, `<kill>`, `<status>`) up front; callers add their own
    /// tasks with [`Backend::add_task`]/[`Backend::add_tasks`] before calling
    /// [`Backend::run`].
    pub fn new(config: BackendConfig) -> Self {
        let shared = Shared {
            host: config.host,
            port: config.port,
            tasks: RwLock::new(HashMap::new()),
            codec: Box::new(JsonCodec),
            frame: Frame::new(config.data_size),
            log: Logger::null(),
            in_flight: Mutex::new(0),
            stop: AtomicBool::new(false),
            terminate: AtomicBool::new(false),
            end_resp: Duration::from_secs_f64(config.end_resp_secs),
        };
        let backend = Backend {
            inner: Arc::new(shared),
        };
        backend.register_admin_tasks();
        backend
    }

    /// Swap in a configured logger. Must be called before the backend is
    /// cloned (e.g. to hand to a thread for [`Backend::run`]) — at that point
    /// this is the sole owner of the shared state and the swap is a plain
    /// field assignment through [`Arc::get_mut`].
    pub fn with_logger(mut self, log: Logger) -> Self {
        Arc::get_mut(&mut self.inner)
            .expect("with_logger must be called before the backend is cloned or run")
            .log = log;
        self
    }

    /// Swap in a non-default codec. Same single-owner contract as
    /// [`Backend::with_logger`].
    pub fn with_codec(mut self, codec: impl Codec + 'static) -> Self {
        Arc::get_mut(&mut self.inner)
            .expect("with_codec must be called before the backend is cloned or run")
            .codec = Box::new(codec);
        self
    }

    fn register_admin_tasks(&self) {
        self.add_task(
            STOP,
            TaskEntry::with_backend(|backend: &Backend, _args, _kw| {
                let backend = backend.clone();
                thread::spawn(move || backend.stop_server());
                Ok(Value::Null)
            }),
        );
        self.add_task(
            KILL,
            TaskEntry::with_backend(|backend: &Backend, _args, _kw| {
                let backend = backend.clone();
                thread::spawn(move || backend.terminate_server());
                Ok(Value::Null)
            }),
        );
        self.add_task(
            STATUS,
            TaskEntry::with_backend(|backend: &Backend, _args, _kw| {
                Ok(Value::String(backend.in_flight().to_string()))
            }),
        );
    }

    /// Register (or replace) a single task. Per `spec.md` §5, `add_tasks` is
    /// not synchronized against dispatch in the source; this implementation
    /// guards the registry with an `RwLock` regardless, resolving the open
    /// question in favor of safety at negligible cost (see `DESIGN.md`).
    pub fn add_task(&self, name: impl Into<TaskName>, entry: TaskEntry<Backend>) {
        self.inner.tasks.write().unwrap().insert(name.into(), entry);
    }

    pub fn add_tasks(&self, tasks: impl IntoIterator<Item = (TaskName, TaskEntry<Backend>)>) {
        let mut registry = self.inner.tasks.write().unwrap();
        for (name, entry) in tasks {
            registry.insert(name, entry);
        }
    }

    pub fn host(&self) -> &str {
        &self.inner.host
    }

    pub fn port(&self) -> u16 {
        self.inner.port
    }

    pub fn in_flight(&self) -> u64 {
        *self.inner.in_flight.lock().unwrap()
    }

    pub fn is_stopping(&self) -> bool {
        self.inner.stop.load(Ordering::SeqCst)
    }

    pub fn is_terminating(&self) -> bool {
        self.inner.terminate.load(Ordering::SeqCst)
    }

    /// Increment `in_flight` and return a guard that decrements it on drop.
    /// Exposed for tasks that hand work off to another thread and need to
    /// keep the parent counter balanced across that handoff (`spec.md` §4.2
    /// "Concurrency counter discipline").
    pub fn subtask(&self) -> TaskGuard {
        *self.inner.in_flight.lock().unwrap() += 1;
        TaskGuard {
            shared: self.inner.clone(),
        }
    }

    /// `<stop>`'s background action: refuse no in-flight work, wait for it to
    /// drain, then allow the accept loop to exit.
    fn stop_server(&self) {
        self.inner.stop.store(true, Ordering::SeqCst);
        while self.in_flight() != 0 {
            thread::sleep(self.inner.end_resp);
        }
        self.inner.terminate.store(true, Ordering::SeqCst);
    }

    /// `<kill>`'s background action: terminate immediately, in-flight tasks
    /// notwithstanding.
    fn terminate_server(&self) {
        self.inner.terminate.store(true, Ordering::SeqCst);
    }

    /// Bind, accept connections until stopped or killed, then close.
    /// Mirrors the pseudocode in `spec.md` §4.2: the accept loop exits as
    /// soon as either flag is set, then a drain loop waits for `terminate`
    /// (set either immediately by `<kill>` or once `in_flight` reaches zero
    /// by the `<stop>` background thread). The listener is bound and polled
    /// non-blockingly right here, so it is owned by this call and closes the
    /// moment it returns — no detached thread is left blocked in `accept`
    /// holding the socket open (`spec.md` §4.2 "close socket"; §5 "The
    /// backend's listen socket is closed in the top-level finalizer of
    /// main").
    pub fn run(&self) -> io::Result<()> {
        let listener = TcpListener::bind((self.inner.host.as_str(), self.inner.port))?;
        listener.set_nonblocking(true)?;
        self.inner.log.info(&format!(
            "backend listening on {}:{}",
            self.inner.host, self.inner.port
        ));

        while !(self.is_stopping() || self.is_terminating()) {
            match listener.accept() {
                Ok((stream, _addr)) => {
                    stream.set_nonblocking(false)?;
                    let backend = self.clone();
                    thread::spawn(move || backend.handle_connection(stream));
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(self.inner.end_resp);
                }
                Err(e) => {
                    self.inner.log.error(&format!("accept failed: {e}"));
                    break;
                }
            }
        }

        while !self.is_terminating() {
            thread::sleep(self.inner.end_resp);
        }

        self.inner.log.info("backend shut down");
        Ok(())
    }

    fn handle_connection(&self, mut stream: TcpStream) {
        let request_bytes = match self.inner.frame.recv(&mut stream) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.inner.log.error(&format!("framing error on accept: {e}"));
                return;
            }
        };
        self.inner
            .log
            .debug(&format!("received {} bytes", request_bytes.len()));

        let value = match self.inner.codec.decode(&request_bytes) {
            Ok(v) => v,
            Err(e) => {
                self.inner.log.error(&format!("failed to decode request: {e}"));
                return;
            }
        };
        let (name, args, kwargs): Request = match serde_json::from_value(value) {
            Ok(req) => req,
            Err(e) => {
                self.inner.log.error(&format!("malformed request envelope: {e}"));
                return;
            }
        };

        let _guard = self.subtask();
        let response = self.dispatch(&name, args, kwargs);

        self.inner.log.info(&format!("task {name} complete"));
        let encoded = self.inner.codec.encode(&response.to_value());
        if let Err(e) = self.inner.frame.send(&mut stream, &encoded) {
            self.inner.log.error(&format!("failed to send response: {e}"));
        }
    }

    fn dispatch(&self, name: &str, args: Args, kwargs: KwArgs) -> Response {
        let entry = self.inner.tasks.read().unwrap().get(name).cloned();
        let Some(entry) = entry else {
            return Response::from_task_error(&TaskError::new(
                "UnknownTask",
                vec![Value::String(name.to_string())],
            ));
        };

        let outcome = match entry {
            TaskEntry::Plain(f) => {
                panic::catch_unwind(AssertUnwindSafe(|| (*f)(args, kwargs)))
            }
            TaskEntry::WithBackend(f) => {
                let this = self.clone();
                panic::catch_unwind(AssertUnwindSafe(|| (*f)(&this, args, kwargs)))
            }
        };

        match outcome {
            Ok(Ok(value)) => Response::success(value),
            Ok(Err(task_error)) => Response::from_task_error(&task_error),
            Err(panic) => {
                let message = panic_message(&panic);
                self.inner.log.error(&format!("task {name} panicked: {message}"));
                Response::from_task_error(&TaskError::new("Panic", vec![Value::String(message)]))
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::net::TcpStream as StdTcpStream;

    fn config_on(port: u16) -> BackendConfig {
        BackendConfig {
            host: "127.0.0.1".to_string(),
            port,
            data_size: 2048,
            end_resp_secs: 0.05,
        }
    }

    fn send_request(port: u16, name: &str, args: Vec<Value>) -> Value {
        let mut stream = StdTcpStream::connect(("127.0.0.1", port)).unwrap();
        let frame = Frame::new(2048);
        let payload = serde_json::to_vec(&json!((name, args, {}))).unwrap();
        frame.send(&mut stream, &payload).unwrap();
        let reply = frame.recv(&mut stream).unwrap();
        serde_json::from_slice(&reply).unwrap()
    }

    #[test]
    fn add_then_echo_round_trip() {
        let backend = Backend::new(config_on(54601));
        backend.add_task(
            "add",
            TaskEntry::plain(|args, _kw| {
                let a = args[0].as_i64().unwrap();
                let b = args[1].as_i64().unwrap();
                Ok(json!(a + b))
            }),
        );

        let handle = {
            let backend = backend.clone();
            thread::spawn(move || backend.run())
        };
        thread::sleep(Duration::from_millis(50));

        let reply = send_request(54601, "add", vec![json!(4), json!(4)]);
        assert_eq!(reply, json!(["success", 8]));
        assert_eq!(backend.in_flight(), 0);

        backend.terminate_server();
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn unknown_task_reports_structured_error() {
        let backend = Backend::new(config_on(54602));
        let handle = {
            let backend = backend.clone();
            thread::spawn(move || backend.run())
        };
        thread::sleep(Duration::from_millis(50));

        let reply = send_request(54602, "does-not-exist", vec![]);
        assert_eq!(reply[0], json!("error"));
        assert_eq!(reply[1], json!("UnknownTask"));

        backend.terminate_server();
        handle.join().unwrap().unwrap();
    }
}
