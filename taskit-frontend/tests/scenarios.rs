//! Frontend-against-real-backend scenarios (E4, E7-adjacent bits of `spec.md`
//! §8; E1/E3 are covered from the backend side in `taskit-backend`'s own
//! integration tests, so this file focuses on frontend-specific behavior:
//! failover and admin signal transmission).

use std::thread;
use std::time::Duration;

use serde_json::{json, Map};

use taskit_backend::Backend;
use taskit_core::config::{BackendAddr, BackendConfig, FrontendConfig};
use taskit_core::task::TaskEntry;
use taskit_frontend::Frontend;

fn spawn_backend(port: u16) -> Backend {
    let backend = Backend::new(BackendConfig {
        host: "127.0.0.1".to_string(),
        port,
        data_size: 2048,
        end_resp_secs: 0.05,
    });
    backend.add_task(
        "add",
        TaskEntry::plain(|args, _kw| {
            Ok(json!(args[0].as_i64().unwrap() + args[1].as_i64().unwrap()))
        }),
    );
    let runner = backend.clone();
    thread::spawn(move || runner.run());
    thread::sleep(Duration::from_millis(80));
    backend
}

/// E4 — failover: the first registered backend is unreachable, the second is
/// up; `work` returns the second's result and neither's `in_flight` is left
/// nonzero.
#[test]
fn e4_failover_to_second_backend() {
    let live = spawn_backend(54801);

    let frontend = Frontend::new(FrontendConfig {
        backends: vec![
            BackendAddr::HostPort("127.0.0.1".into(), 54899), // nothing listening here
            BackendAddr::HostPort("127.0.0.1".into(), 54801),
        ],
        default_port: 54543,
        data_size: 2048,
    });

    let result = frontend.work("add", vec![json!(1), json!(2)], Map::new()).unwrap();
    assert_eq!(result, json!(3));

    thread::sleep(Duration::from_millis(20));
    assert_eq!(live.in_flight(), 0);

    let _ = frontend.send_kill(&("127.0.0.1".to_string(), 54801));
}

/// A task that raises on the backend surfaces as a structured
/// `BackendError::Processing` on the frontend (§7 item 3, §4.3 step 6).
#[test]
fn backend_error_surfaces_as_processing_error() {
    let backend = Backend::new(BackendConfig {
        host: "127.0.0.1".to_string(),
        port: 54802,
        data_size: 2048,
        end_resp_secs: 0.05,
    });
    backend.add_task(
        "boom",
        TaskEntry::plain(|_args, _kw| {
            Err(taskit_core::TaskError::new("ValueError", vec![json!("bad"), json!(11)]))
        }),
    );
    let runner = backend.clone();
    thread::spawn(move || runner.run());
    thread::sleep(Duration::from_millis(80));

    let frontend = Frontend::new(FrontendConfig {
        backends: vec![BackendAddr::HostPort("127.0.0.1".into(), 54802)],
        default_port: 54543,
        data_size: 2048,
    });

    let err = frontend.work("boom", vec![], Map::new()).unwrap_err();
    match err {
        taskit_core::BackendError::Processing(task_error) => {
            assert_eq!(task_error.name, "ValueError");
            assert_eq!(task_error.args, vec![json!("bad"), json!(11)]);
        }
        other => panic!("expected Processing error, got {other:?}"),
    }

    let _ = frontend.send_kill(&("127.0.0.1".to_string(), 54802));
}

/// `get_tasks` reports `"down"` for an unreachable backend and a decimal
/// count for a live one.
#[test]
fn get_tasks_reports_down_or_count() {
    let backend = spawn_backend(54803);

    let frontend = Frontend::new(FrontendConfig {
        backends: vec![
            BackendAddr::HostPort("127.0.0.1".into(), 54803),
            BackendAddr::HostPort("127.0.0.1".into(), 54898),
        ],
        default_port: 54543,
        data_size: 2048,
    });

    assert_eq!(frontend.get_tasks(&("127.0.0.1".to_string(), 54803)).unwrap(), "0");
    assert_eq!(frontend.get_tasks(&("127.0.0.1".to_string(), 54898)).unwrap(), "down");

    let _ = frontend.send_kill(&("127.0.0.1".to_string(), 54803));
    let _ = backend;
}

/// An unregistered backend is a caller error, not a "down" backend —
/// `get_tasks` propagates `UnknownBackend` rather than reporting `"down"`.
#[test]
fn get_tasks_rejects_unregistered_backend() {
    let frontend = Frontend::new(FrontendConfig {
        backends: vec![],
        default_port: 54543,
        data_size: 2048,
    });
    let err = frontend.get_tasks(&("127.0.0.1".to_string(), 1)).unwrap_err();
    assert!(matches!(err, taskit_core::BackendError::UnknownBackend));
}
