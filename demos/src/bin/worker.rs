//! Ported from `examples/worker.py`: a backend with a slow doubling task and
//! a task that always fails, for the `frontend_demo` binary to exercise.

use std::thread;
use std::time::Duration;

use serde_json::json;

use taskit_backend::Backend;
use taskit_core::config::BackendConfig;
use taskit_core::task::TaskEntry;
use taskit_core::{Level, Logger, TaskError};

fn main() {
    let log = Logger::terminal(Level::Info);
    log.info("Starting...");

    let backend = Backend::new(BackendConfig {
        host: "127.0.0.1".to_string(),
        port: taskit_core::task::DEFAULT_PORT,
        data_size: 2048,
        end_resp_secs: 0.5,
    })
    .with_logger(log);

    backend.add_task(
        "wait-double",
        TaskEntry::plain(|args, _kw| {
            thread::sleep(Duration::from_millis(200));
            let n = args[0].as_f64().unwrap_or(0.0);
            Ok(json!(n * 2.0))
        }),
    );
    backend.add_task(
        "get-error",
        TaskEntry::plain(|_args, _kw| {
            Err(TaskError::new("AssertionError", vec![json!("Why ever did you call this!?")]))
        }),
    );

    if let Err(e) = backend.run() {
        eprintln!("backend exited with an error: {e}");
    }
}
