//! A local, non-distributed task wrapper (§15 of `SPEC_FULL.md`), ported from
//! `examples/original_source/taskit/simple.py`. Gives a plain closure
//! fire-and-forget/callback semantics without any networking — useful for
//! testing task logic before wiring it up to a [`crate::task::TaskEntry`] on
//! a real backend.

use std::sync::Arc;
use std::thread;

use crate::logging::Logger;

/// What to do with an error raised by a [`LocalTask`] dispatched
/// asynchronously, mirroring the three-way `error_cb` contract used by both
/// `taskit.simple.Task` and the frontend's `callback` (`spec.md` §4.3).
pub enum ErrorHandling<E> {
    /// Log the error and move on (the `error_cb=None` case).
    Log,
    /// Silently drop it (the `error_cb=False` sentinel case).
    Ignore,
    /// Hand it to a callback.
    Handle(Arc<dyn Fn(E) + Send + Sync>),
}

impl<E> ErrorHandling<E> {
    pub fn handle(f: impl Fn(E) + Send + Sync + 'static) -> Self {
        ErrorHandling::Handle(Arc::new(f))
    }
}

/// Wraps a fallible closure with `work`/`ignore`/`callback`, the local
/// (same-process) analogue of the distributed frontend's task dispatch.
pub struct LocalTask<A, O, E> {
    f: Arc<dyn Fn(A) -> Result<O, E> + Send + Sync>,
    log: Logger,
}

impl<A, O, E> LocalTask<A, O, E>
where
    A: Send + 'static,
    O: Send + 'static,
    E: Send + std::fmt::Debug + 'static,
{
    pub fn new(f: impl Fn(A) -> Result<O, E> + Send + Sync + 'static) -> Self {
        LocalTask {
            f: Arc::new(f),
            log: Logger::null(),
        }
    }

    pub fn with_logger(mut self, log: Logger) -> Self {
        self.log = log;
        self
    }

    /// Run synchronously and return the result directly; the caller decides
    /// whether and how to handle failure.
    pub fn work(&self, args: A) -> Result<O, E> {
        (*self.f)(args)
    }

    /// Thread it and forget it; failures are logged at ERROR.
    pub fn ignore(&self, args: A) {
        let f = self.f.clone();
        let log = self.log.clone();
        thread::spawn(move || {
            if let Err(e) = (*f)(args) {
                log.error(&format!("local task failed: {e:?}"));
            }
        });
    }

    /// Thread it, then invoke `success` or dispatch to `on_error`.
    pub fn callback<S>(&self, args: A, success: S, on_error: ErrorHandling<E>)
    where
        S: FnOnce(O) + Send + 'static,
    {
        let f = self.f.clone();
        let log = self.log.clone();
        thread::spawn(move || match (*f)(args) {
            Ok(value) => success(value),
            Err(e) => match on_error {
                ErrorHandling::Log => log.error(&format!("local task failed: {e:?}")),
                ErrorHandling::Ignore => {}
                ErrorHandling::Handle(handler) => (*handler)(e),
            },
        });
    }
}

/// Shorthand constructor mirroring the `@taskit` decorator.
pub fn local_task<A, O, E>(f: impl Fn(A) -> Result<O, E> + Send + Sync + 'static) -> LocalTask<A, O, E>
where
    A: Send + 'static,
    O: Send + 'static,
    E: Send + std::fmt::Debug + 'static,
{
    LocalTask::new(f)
}
