//! Call interception.
//!
//! # Responsibilities
//! - Time the wrapped call
//! - Observe its value, error or panic without changing it
//! - Hand an invocation packet to the worker pool, fire-and-forget
//!
//! # Design Decisions
//! - No policy lookup and no serialization on the calling thread
//! - Panics are caught only long enough to submit the invocation, then resumed
//! - `end_time` is `start_time` plus monotonic elapsed time, so it never
//!   precedes `start_time`
//! - A chained panic hook remembers where the last panic on each thread was
//!   raised, so panics are located at their origin rather than the call site

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe, Location};
use std::sync::Once;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use futures_util::FutureExt;
use serde::Serialize;
use uuid::Uuid;

use crate::audit::record::{Args, Invocation, Outcome};
use crate::observability::metrics;
use crate::policy::CallSite;
use crate::worker::PoolHandle;

/// Wraps calls and submits what it observed to the worker pool.
#[derive(Clone, Debug)]
pub struct Interceptor {
    pool: PoolHandle,
}

impl Interceptor {
    pub fn new(pool: PoolHandle) -> Self {
        install_panic_hook();
        Self { pool }
    }

    /// Run a fallible call under instrumentation.
    ///
    /// The returned value, error or panic is exactly what `call` produced.
    #[track_caller]
    pub fn intercept<T, E, F>(&self, site: &CallSite, args: Args, call: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        T: Serialize + Clone + Send + 'static,
        E: fmt::Display,
    {
        let line = Location::caller().line();
        clear_panic_location();
        let timer = CallTimer::start();
        let outcome = panic::catch_unwind(AssertUnwindSafe(call));
        let (start_time, end_time) = timer.finish();

        match outcome {
            Ok(Ok(value)) => {
                let captured = Outcome::Returned(Box::new(value.clone()));
                self.submit(site.clone(), args, captured, start_time, end_time);
                Ok(value)
            }
            Ok(Err(err)) => {
                let failed = failure(site, line, err.to_string());
                self.submit(site.clone(), args, failed, start_time, end_time);
                Err(err)
            }
            Err(payload) => {
                let failed = panicked(site, line, payload.as_ref());
                self.submit(site.clone(), args, failed, start_time, end_time);
                panic::resume_unwind(payload)
            }
        }
    }

    /// Run an infallible call under instrumentation.
    #[track_caller]
    pub fn observe<T, F>(&self, site: &CallSite, args: Args, call: F) -> T
    where
        F: FnOnce() -> T,
        T: Serialize + Clone + Send + 'static,
    {
        match self.intercept(site, args, || Ok::<T, std::convert::Infallible>(call())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Run a fallible future under instrumentation.
    #[track_caller]
    pub fn intercept_async<T, E, Fut>(
        &self,
        site: &CallSite,
        args: Args,
        call: Fut,
    ) -> impl Future<Output = Result<T, E>>
    where
        Fut: Future<Output = Result<T, E>>,
        T: Serialize + Clone + Send + 'static,
        E: fmt::Display,
    {
        let line = Location::caller().line();
        let this = self.clone();
        let site = site.clone();

        async move {
            clear_panic_location();
            let timer = CallTimer::start();
            let outcome = AssertUnwindSafe(call).catch_unwind().await;
            let (start_time, end_time) = timer.finish();

            match outcome {
                Ok(Ok(value)) => {
                    let captured = Outcome::Returned(Box::new(value.clone()));
                    this.submit(site, args, captured, start_time, end_time);
                    Ok(value)
                }
                Ok(Err(err)) => {
                    let failed = failure(&site, line, err.to_string());
                    this.submit(site, args, failed, start_time, end_time);
                    Err(err)
                }
                Err(payload) => {
                    let failed = panicked(&site, line, payload.as_ref());
                    this.submit(site, args, failed, start_time, end_time);
                    panic::resume_unwind(payload)
                }
            }
        }
    }

    fn submit(&self, site: CallSite, args: Args, outcome: Outcome, start_time: i64, end_time: i64) {
        let invocation = Invocation {
            id: Uuid::new_v4(),
            site,
            args,
            outcome,
            start_time,
            end_time,
        };
        metrics::record_call_duration(invocation.elapsed_ms());

        let id = invocation.id;
        match self.pool.submit(invocation) {
            Ok(()) => metrics::record_invocation_submitted(),
            Err(e) => {
                metrics::record_dropped("pipeline_closed");
                tracing::debug!(id = %id, error = %e, "Invocation not audited");
            }
        }
    }
}

fn failure(site: &CallSite, line: u32, message: String) -> Outcome {
    Outcome::Failed {
        message,
        location: format!("{}:{}", site.target_address(), line),
    }
}

fn panicked(site: &CallSite, line: u32, payload: &(dyn Any + Send)) -> Outcome {
    let message = panic_message(payload);
    match last_panic_location() {
        Some(location) => Outcome::Failed { message, location },
        None => failure(site, line, message),
    }
}

thread_local! {
    static PANIC_LOCATION: RefCell<Option<String>> = const { RefCell::new(None) };
}

static PANIC_HOOK: Once = Once::new();

/// Chain a hook that records `file:line` of each panic on the panicking thread.
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if let Some(location) = info.location() {
                let origin = format!("{}:{}", location.file(), location.line());
                // The slot may be borrowed if a panic fires while it is updated.
                let _ = PANIC_LOCATION.try_with(|slot| {
                    if let Ok(mut slot) = slot.try_borrow_mut() {
                        *slot = Some(origin);
                    }
                });
            }
            previous(info);
        }));
    });
}

fn clear_panic_location() {
    let _ = PANIC_LOCATION.try_with(|slot| slot.borrow_mut().take());
}

/// Left in place so an enclosing interception of the same panic sees it too.
fn last_panic_location() -> Option<String> {
    PANIC_LOCATION
        .try_with(|slot| slot.borrow().clone())
        .ok()
        .flatten()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

/// Epoch start plus monotonic elapsed time.
struct CallTimer {
    start_time: i64,
    started: Instant,
}

impl CallTimer {
    fn start() -> Self {
        let start_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64;
        Self {
            start_time,
            started: Instant::now(),
        }
    }

    fn finish(self) -> (i64, i64) {
        let elapsed = self.started.elapsed().as_millis() as i64;
        (self.start_time, self.start_time + elapsed)
    }
}
