//! End-to-end scenarios against a running backend, exercising it the way a
//! frontend would over a loopback socket (E1, E2, E3, E5, E6 in `spec.md` §8).

use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use serde_json::{json, Value};

use taskit_backend::Backend;
use taskit_core::config::BackendConfig;
use taskit_core::task::TaskEntry;
use taskit_core::Frame;

fn spawn_backend(port: u16, data_size: usize) -> Backend {
    let backend = Backend::new(BackendConfig {
        host: "127.0.0.1".to_string(),
        port,
        data_size,
        end_resp_secs: 0.05,
    });
    let runner = backend.clone();
    thread::spawn(move || runner.run());
    thread::sleep(Duration::from_millis(80));
    backend
}

fn call(port: u16, data_size: usize, name: &str, args: Vec<Value>) -> Value {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
    let frame = Frame::new(data_size);
    let payload = serde_json::to_vec(&json!((name, args, {}))).unwrap();
    frame.send(&mut stream, &payload).unwrap();
    let reply = frame.recv(&mut stream).unwrap();
    serde_json::from_slice(&reply).unwrap()
}

/// E1 — round-trip: `add(4, 4)` returns `8`, `in_flight` settles back to 0.
#[test]
fn e1_round_trip() {
    let backend = spawn_backend(54701, 2048);
    backend.add_task(
        "add",
        TaskEntry::plain(|args, _kw| {
            Ok(json!(args[0].as_i64().unwrap() + args[1].as_i64().unwrap()))
        }),
    );

    let reply = call(54701, 2048, "add", vec![json!(4), json!(4)]);
    assert_eq!(reply, json!(["success", 8]));

    thread::sleep(Duration::from_millis(20));
    assert_eq!(backend.in_flight(), 0);

    let _ = call(54701, 2048, "<kill>", vec![]);
}

/// E2 — large-payload framing: a 3000-byte echo round-trips exactly with
/// `data_size = 2048` (two segments each way).
#[test]
fn e2_large_payload_framing() {
    let backend = spawn_backend(54702, 2048);
    backend.add_task(
        "echo",
        TaskEntry::plain(|args, _kw| Ok(args[0].clone())),
    );

    let payload = "4".repeat(3000);
    let reply = call(54702, 2048, "echo", vec![json!(payload)]);
    assert_eq!(reply, json!(["success", payload]));

    let _ = call(54702, 2048, "<kill>", vec![]);
}

/// E3 — backend-side error: a task's `Err(TaskError)` is reported faithfully.
#[test]
fn e3_backend_side_error() {
    let backend = spawn_backend(54703, 2048);
    backend.add_task(
        "boom",
        TaskEntry::plain(|_args, _kw| {
            Err(taskit_core::TaskError::new(
                "ValueError",
                vec![json!("bad"), json!(11)],
            ))
        }),
    );

    let reply = call(54703, 2048, "boom", vec![]);
    assert_eq!(reply, json!(["error", "ValueError", ["bad", 11]]));

    let _ = call(54703, 2048, "<kill>", vec![]);
}

/// E5 — admin status: three concurrent slow tasks are reflected in
/// `<status>`, and it returns to `"0"` once they finish.
#[test]
fn e5_admin_status() {
    let backend = spawn_backend(54705, 2048);
    backend.add_task(
        "sleep_then",
        TaskEntry::plain(|args, _kw| {
            let secs = args[0].as_f64().unwrap();
            thread::sleep(Duration::from_secs_f64(secs));
            Ok(args[0].clone())
        }),
    );

    for _ in 0..3 {
        thread::spawn(move || {
            let _ = call(54705, 2048, "sleep_then", vec![json!(0.3)]);
        });
    }
    thread::sleep(Duration::from_millis(100));

    let status = call(54705, 2048, "<status>", vec![]);
    let count: u64 = status[1].as_str().unwrap().parse().unwrap();
    assert!((1..=3).contains(&count), "expected 1..=3 in flight, got {count}");

    thread::sleep(Duration::from_millis(500));
    let status = call(54705, 2048, "<status>", vec![]);
    assert_eq!(status[1].as_str().unwrap(), "0");

    let _ = call(54705, 2048, "<kill>", vec![]);
}

/// E6 — graceful stop: in-flight tasks finish and reply normally while the
/// server drains, and it shuts down only after they complete.
#[test]
fn e6_graceful_stop() {
    let backend = spawn_backend(54706, 2048);
    backend.add_task(
        "slow",
        TaskEntry::plain(|_args, _kw| {
            thread::sleep(Duration::from_millis(300));
            Ok(json!("done"))
        }),
    );

    let mut handles = Vec::new();
    for _ in 0..2 {
        handles.push(thread::spawn(|| call(54706, 2048, "slow", vec![])));
    }
    thread::sleep(Duration::from_millis(50));

    let stop_reply = call(54706, 2048, "<stop>", vec![]);
    assert_eq!(stop_reply[0], json!("success"));

    for handle in handles {
        assert_eq!(handle.join().unwrap(), json!(["success", "done"]));
    }

    thread::sleep(Duration::from_millis(200));
    assert!(backend.is_terminating());
}
