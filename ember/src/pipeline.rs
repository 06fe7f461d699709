//! Background work whose result flows back into the logic context.
//!
//! Every request runs in three strictly ordered steps: the transform on IO,
//! a completion task posted to UI, and the continuation invoked there if its
//! owner is still alive. The continuation never runs on IO and never inside
//! the call that started the request. A request made once IO has closed is
//! dropped, as is a result that finds UI closed.

use std::panic::{self, AssertUnwindSafe};

use log::{debug, warn};

use crate::isolate::Continuation;
use crate::runtime::TaskRunners;

pub fn run_on_io_then_ui<I, R, F>(
    runners: &TaskRunners,
    input: I,
    transform: F,
    continuation: Continuation<Option<R>>,
) where
    I: Send + 'static,
    R: Send + 'static,
    F: FnOnce(I) -> Option<R> + Send + 'static,
{
    let ui = runners.ui().clone();
    let owner = continuation.owner();

    let posted = runners.io().try_post(move || {
        let result = panic::catch_unwind(AssertUnwindSafe(move || transform(input)))
            .unwrap_or_else(|_| {
                warn!("background transform panicked; delivering no result");
                None
            });

        let posted = ui.try_post(move || {
            continuation.invoke(result);
        });
        if posted.is_err() {
            debug!("UI closed before result for {} could be delivered", owner);
        }
    });
    if posted.is_err() {
        debug!("IO closed; dropping background request from {}", owner);
    }
}
