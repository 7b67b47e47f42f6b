//! Fan-out protocol
//!
//! Dispatches exactly one operation per target, concurrently, and resolves
//! once after every target has reported. Overall success means at least one
//! target succeeded; failures are returned as a list of ids so callers can
//! detect partial delivery.

mod dispatcher;
mod latch;

pub use dispatcher::GroupDispatcher;
pub use latch::FanoutLatch;

use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;

use crate::defer::next_tick;
use crate::{LobbyResult, ServerId};

/// One fan-out target
#[derive(Debug, Clone, PartialEq)]
pub enum FanoutTarget<T> {
    /// Dispatch `payload` to the server `id`
    Dispatch { id: ServerId, payload: T },
    /// A target with nothing to send; counts as a success on a later step
    Empty { id: ServerId },
}

impl<T> FanoutTarget<T> {
    pub fn id(&self) -> &str {
        match self {
            Self::Dispatch { id, .. } | Self::Empty { id } => id,
        }
    }
}

/// Run `dispatch` once per target and aggregate the outcomes.
///
/// `dispatch` resolves to the partial failure ids reported by the target
/// (uids that were not delivered). A target error is logged and its id is
/// added to the failure list. Returns
/// [`AllTargetsFailed`](crate::LobbyError::AllTargetsFailed) only when no
/// target succeeded.
pub async fn fan_out<T, F, Fut>(targets: Vec<FanoutTarget<T>>, dispatch: F) -> LobbyResult<Vec<String>>
where
    F: Fn(ServerId, T) -> Fut,
    Fut: Future<Output = LobbyResult<Vec<String>>>,
{
    let mut latch = FanoutLatch::new(targets.len());
    if targets.is_empty() {
        next_tick().await;
        return latch.finish();
    }

    let dispatch = &dispatch;
    let mut pending: FuturesUnordered<_> = targets
        .into_iter()
        .map(|target| async move {
            match target {
                FanoutTarget::Empty { id } => {
                    next_tick().await;
                    (id, Ok(Vec::new()))
                }
                FanoutTarget::Dispatch { id, payload } => {
                    let outcome = dispatch(id.clone(), payload).await;
                    (id, outcome)
                }
            }
        })
        .collect();

    while let Some((id, outcome)) = pending.next().await {
        match outcome {
            Ok(partial) => {
                latch.record_success(partial);
            }
            Err(e) => {
                tracing::error!(server_id = %id, error = %e, "Fan-out target failed");
                latch.record_failure(id);
            }
        }
    }

    latch.finish()
}
