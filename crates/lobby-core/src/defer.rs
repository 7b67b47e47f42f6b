//! Deferred execution
//!
//! Every operation that reports a known result still completes on a later
//! scheduling step, so callers never observe completion inside their own stack.

/// Suspend the current task for one scheduling step.
pub async fn next_tick() {
    tokio::task::yield_now().await;
}

/// Run `f` on a later scheduling step, detached from the caller.
///
/// Must be called from within a Tokio runtime.
pub fn defer<F>(f: F)
where
    F: FnOnce() + Send + 'static,
{
    tokio::spawn(async move {
        next_tick().await;
        f();
    });
}
