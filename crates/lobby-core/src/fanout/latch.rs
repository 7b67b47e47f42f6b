use crate::{LobbyError, LobbyResult};

/// Outcome bookkeeping for one fan-out call.
///
/// Overall success means at least one target succeeded. Failed target ids and
/// any partial failures reported by successful targets are merged into one list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanoutLatch {
    expected: usize,
    remaining: usize,
    succeeded: bool,
    failed_ids: Vec<String>,
}

impl FanoutLatch {
    #[must_use]
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            remaining: expected,
            succeeded: false,
            failed_ids: Vec::new(),
        }
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn is_done(&self) -> bool {
        self.remaining == 0
    }

    pub fn failed_ids(&self) -> &[String] {
        &self.failed_ids
    }

    /// Record a successful target. Returns true once every target has resolved.
    pub fn record_success(&mut self, partial_failures: Vec<String>) -> bool {
        self.succeeded = true;
        self.failed_ids.extend(partial_failures);
        self.resolve_one()
    }

    /// Record a failed target. Returns true once every target has resolved.
    pub fn record_failure(&mut self, target_id: impl Into<String>) -> bool {
        self.failed_ids.push(target_id.into());
        self.resolve_one()
    }

    fn resolve_one(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.is_done()
    }

    /// Final outcome. Zero targets is a success with no failures.
    pub fn finish(self) -> LobbyResult<Vec<String>> {
        if self.expected == 0 || self.succeeded {
            Ok(self.failed_ids)
        } else {
            Err(LobbyError::AllTargetsFailed {
                attempted: self.expected,
            })
        }
    }
}
