//! Ported from `examples/simple.py`: exercises the local (non-distributed)
//! task wrapper's `work`/`ignore`/`callback` without any networking.

use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use taskit_core::local::{local_task, ErrorHandling};
use taskit_core::{Level, Logger};

fn now() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs_f64()
}

fn main() {
    let log = Logger::terminal(Level::Info);

    let slow_time = local_task(|wait: f64| -> Result<f64, String> {
        thread::sleep(Duration::from_secs_f64(wait));
        Ok(now())
    });
    let instant_time = local_task(|_: ()| -> Result<f64, String> { Ok(now()) });
    let error_time = local_task(|_: ()| -> Result<f64, String> { Err(format!("{}", now())) });

    log.info("Waiting for slow_time(1)");
    log.info(&format!("Got result: {:?}", slow_time.work(1.0)));

    log.info("Ignoring instant_time()");
    instant_time.ignore(());

    log.info("Ignoring error_time()");
    error_time.ignore(());

    log.info("Using default error handling with error_time()");
    error_time.callback((), |res| println!("Called with {res:?}"), ErrorHandling::Log);

    log.info("Using callback with instant_time()");
    instant_time.callback(
        (),
        |res| println!("Called with {res:?}"),
        ErrorHandling::handle(|e| eprintln!("Got an error callback, with arg of {e:?}")),
    );

    log.info("Using callback with error_time()");
    error_time.callback(
        (),
        |res| println!("Called with {res:?}"),
        ErrorHandling::handle(|e| eprintln!("Got an error callback, with arg of {e:?}")),
    );

    // Let everything finish.
    thread::sleep(Duration::from_millis(100));
}
