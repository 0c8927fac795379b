//! Ported from `examples/main.py`: drives the `worker` backend via three
//! asynchronous `wait-double` calls (one with a huge argument, to exercise
//! the multi-segment framing path), a `<status>` check, and a failing task.

use std::thread;
use std::time::Duration;

use serde_json::{json, Map};

use taskit_core::config::{BackendAddr, FrontendConfig};
use taskit_core::{Level, Logger};
use taskit_frontend::{ErrorCallback, Frontend};

fn main() {
    let log = Logger::terminal(Level::Info);
    let frontend = Frontend::new(FrontendConfig {
        backends: vec![BackendAddr::Host("127.0.0.1".to_string())],
        default_port: taskit_core::task::DEFAULT_PORT,
        data_size: 2048,
    })
    .with_logger(log.clone());

    let backend_addr = ("127.0.0.1".to_string(), taskit_core::task::DEFAULT_PORT);

    log.info("Starting 3 wait-double tasks, with args of 1, 5, and a very large number.");
    frontend.callback("wait-double", vec![json!(1)], Map::new(), {
        let log = log.clone();
        move |res| log.info(&format!("Received result: {res}"))
    }, ErrorCallback::Log);
    frontend.callback("wait-double", vec![json!(5)], Map::new(), {
        let log = log.clone();
        move |res| log.info(&format!("Received result: {res}"))
    }, ErrorCallback::Log);
    // A ~9,600-byte payload both ways: exercises the multi-segment First
    // Bytes path end to end.
    let huge = "9".repeat(4800);
    frontend.callback("wait-double", vec![json!(huge)], Map::new(), {
        let log = log.clone();
        move |res| log.info(&format!("Received result of length {}", res.to_string().len()))
    }, ErrorCallback::Log);

    thread::sleep(Duration::from_millis(100));

    match frontend.get_tasks(&backend_addr) {
        Ok(tasks) if tasks.chars().all(|c| c.is_ascii_digit()) && !tasks.is_empty() => {
            log.info(&format!("Backend is running {tasks} jobs..."));
        }
        Ok(tasks) => log.info(&format!("Backend is {tasks}")),
        Err(e) => log.error(&format!("Could not query backend status: {e}")),
    }

    log.info("Starting a get-error task");
    frontend.callback(
        "get-error",
        vec![],
        Map::new(),
        {
            let log = log.clone();
            move |res| log.info(&format!("Received result: {res}"))
        },
        ErrorCallback::handle({
            let log = log.clone();
            move |e| log.error(&format!("Received a BackendProcessingError: {e}"))
        }),
    );

    thread::sleep(Duration::from_secs(1));
    log.info("Stopping backend...");
    let _ = frontend.send_stop(&backend_addr);
}
