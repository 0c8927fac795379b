//! Ported from `examples/resync.py`: a worker task hands its result to a
//! shared [`Mediator`] instead of returning it directly; `main` blocks on
//! `get()` until the worker delivers.

use std::thread;
use std::time::Duration;

use taskit_core::local::local_task;
use taskit_core::Mediator;

fn main() {
    let mediator: Mediator<(i32, i32), String> = Mediator::new();

    let worker = {
        let mediator = mediator.clone();
        local_task(move |args: (i32, i32)| -> Result<(), String> {
            thread::sleep(Duration::from_secs(1));
            mediator.set_result(args);
            Ok(())
        })
    };

    worker.ignore((5, 6));
    println!("{:?}", mediator.get(None));
}
