//! The resync primitive (`spec.md` §4.4): a one-shot rendezvous that lets a
//! worker thread hand a result or error back to a waiter, with an optional
//! bounded-time wait.
//!
//! The original implementation polls a non-blocking lock acquisition with
//! exponential backoff (0.5ms doubling, capped at 50ms) because its only lock
//! primitive doesn't accept a timeout. Rust's `Condvar::wait_timeout` is a
//! native timed wait, so this implementation uses that directly rather than
//! reimplementing the backoff loop — see `DESIGN.md` for the Open Question
//! this resolves. The externally observable contract (immediate return if the
//! result is already set, `Timeout` after at least the requested duration) is
//! unchanged.

use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// The outcome of a [`Mediator::get`] call that didn't simply return `Ok(T)`.
#[derive(Debug, Clone, PartialEq)]
pub enum GetError<E> {
    /// Neither `set_result` nor `set_error` was called before the deadline.
    Timeout,
    /// The setter reported a failure.
    Failed(E),
}

struct State<T, E> {
    slot: Mutex<Option<Result<T, E>>>,
    cond: Condvar,
}

/// A one-shot future: exactly one of `set_result`/`set_error` is expected to
/// be called, and at most one `get`.
pub struct Mediator<T, E> {
    state: Arc<State<T, E>>,
}

impl<T, E> Clone for Mediator<T, E> {
    fn clone(&self) -> Self {
        Mediator {
            state: self.state.clone(),
        }
    }
}

impl<T, E> Default for Mediator<T, E> {
    fn default() -> Self {
        Mediator::new()
    }
}

impl<T, E> Mediator<T, E> {
    pub fn new() -> Self {
        Mediator {
            state: Arc::new(State {
                slot: Mutex::new(None),
                cond: Condvar::new(),
            }),
        }
    }

    /// The worker thread calls this on success.
    pub fn set_result(&self, value: T) {
        let mut slot = self.state.slot.lock().unwrap();
        *slot = Some(Ok(value));
        self.state.cond.notify_all();
    }

    /// The worker thread calls this instead of letting an error escape
    /// unmanaged.
    pub fn set_error(&self, error: E) {
        let mut slot = self.state.slot.lock().unwrap();
        *slot = Some(Err(error));
        self.state.cond.notify_all();
    }

    /// Wait for a result. `None` blocks indefinitely; `Some(timeout)` returns
    /// [`GetError::Timeout`] if neither setter has been called within
    /// `timeout`.
    pub fn get(&self, timeout: Option<Duration>) -> Result<T, GetError<E>> {
        let mut slot = self.state.slot.lock().unwrap();
        match timeout {
            None => {
                while slot.is_none() {
                    slot = self.state.cond.wait(slot).unwrap();
                }
            }
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                while slot.is_none() {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(GetError::Timeout);
                    }
                    let (guard, result) = self.state.cond.wait_timeout(slot, remaining).unwrap();
                    slot = guard;
                    if result.timed_out() && slot.is_none() {
                        return Err(GetError::Timeout);
                    }
                }
            }
        }

        match slot.take().expect("checked non-empty above") {
            Ok(v) => Ok(v),
            Err(e) => Err(GetError::Failed(e)),
        }
    }
}

/// Wraps an arbitrary `FnOnce` with a [`Mediator`]: `spawn` runs it on a
/// fresh thread, forwarding its `Ok`/`Err` to the mediator; `get` delegates to
/// the mediator.
pub struct Resyncer<T, E> {
    mediator: Mediator<T, E>,
}

impl<T, E> Resyncer<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Spawn `f` on a background thread and return a handle whose `get` waits
    /// for it to finish.
    pub fn spawn<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
    {
        let mediator = Mediator::new();
        let worker_mediator = mediator.clone();
        thread::spawn(move || match f() {
            Ok(v) => worker_mediator.set_result(v),
            Err(e) => worker_mediator.set_error(e),
        });
        Resyncer { mediator }
    }

    pub fn get(&self, timeout: Option<Duration>) -> Result<T, GetError<E>> {
        self.mediator.get(timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn result_set_before_get_returns_immediately() {
        let mediator: Mediator<i32, ()> = Mediator::new();
        mediator.set_result(42);
        assert_eq!(mediator.get(None), Ok(42));
    }

    #[test]
    fn error_is_reported() {
        let mediator: Mediator<i32, String> = Mediator::new();
        mediator.set_error("boom".to_string());
        assert_eq!(mediator.get(None), Err(GetError::Failed("boom".to_string())));
    }

    #[test]
    fn timeout_without_any_setter() {
        let mediator: Mediator<i32, ()> = Mediator::new();
        let start = Instant::now();
        let result = mediator.get(Some(Duration::from_millis(100)));
        assert_eq!(result, Err(GetError::Timeout));
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn worker_thread_hands_off_result() {
        let mediator: Mediator<i32, ()> = Mediator::new();
        let worker = mediator.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            worker.set_result(7);
        });
        assert_eq!(mediator.get(Some(Duration::from_secs(1))), Ok(7));
    }

    #[test]
    fn resyncer_forwards_return_value() {
        let resyncer = Resyncer::spawn(|| -> Result<i32, ()> {
            thread::sleep(Duration::from_millis(10));
            Ok(99)
        });
        assert_eq!(resyncer.get(Some(Duration::from_secs(1))), Ok(99));
    }
}
