//! Buffered scheduler
//!
//! Accumulates messages per session and writes them as one batch, either on
//! the flush timer or as soon as a session's queue reaches `max_batch`.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{PushBatch, PushScheduler};
use crate::defer::next_tick;
use crate::session::{SessionEvent, SessionRegistry};
use crate::{LobbyResult, SessionId};

type Queues = Arc<Mutex<HashMap<SessionId, Vec<Bytes>>>>;

/// Configuration for the buffered scheduler
#[derive(Debug, Clone)]
pub struct BufferedConfig {
    /// How often pending queues are flushed
    pub flush_interval: Duration,
    /// Queue length that triggers an immediate flush for that session
    pub max_batch: usize,
}

impl Default for BufferedConfig {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_millis(20),
            max_batch: 64,
        }
    }
}

/// Per-session buffering push scheduler
pub struct BufferedScheduler {
    sessions: SessionRegistry,
    config: BufferedConfig,
    queues: Queues,
    running: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl BufferedScheduler {
    #[must_use]
    pub fn new(sessions: SessionRegistry, config: BufferedConfig) -> Self {
        Self {
            sessions,
            config,
            queues: Arc::new(Mutex::new(HashMap::new())),
            running: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
        }
    }

    /// Check if the flush loop is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Number of sessions with queued messages
    pub fn pending_sessions(&self) -> usize {
        self.queues.lock().len()
    }

    /// Hand every pending queue to its session. Returns how many sessions were written.
    pub fn flush(&self) -> usize {
        flush_all(&self.sessions, &self.queues)
    }
}

fn deliver(sessions: &SessionRegistry, sid: SessionId, messages: Vec<Bytes>) -> bool {
    match sessions.get(sid) {
        Some(session) => {
            session.send_batch(messages);
            true
        }
        None => {
            tracing::debug!(
                session_id = sid,
                dropped = messages.len(),
                "Dropping buffered messages for missing session"
            );
            false
        }
    }
}

fn flush_all(sessions: &SessionRegistry, queues: &Queues) -> usize {
    let drained: Vec<_> = queues.lock().drain().collect();
    drained
        .into_iter()
        .map(|(sid, messages)| deliver(sessions, sid, messages))
        .filter(|written| *written)
        .count()
}

async fn run_flush_loop(
    sessions: SessionRegistry,
    queues: Queues,
    running: Arc<AtomicBool>,
    flush_interval: Duration,
) {
    let mut ticker = tokio::time::interval(flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut events = sessions.subscribe();

    while running.load(Ordering::SeqCst) {
        tokio::select! {
            _ = ticker.tick() => {
                flush_all(&sessions, &queues);
            }
            event = events.recv() => match event {
                Ok(SessionEvent::Closed { session, .. }) => {
                    queues.lock().remove(&session.id);
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "Buffered scheduler lagged behind session events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::warn!("Session event channel closed");
                    break;
                }
            }
        }
    }

    tracing::debug!("Buffered scheduler flush loop ended");
}

#[async_trait]
impl PushScheduler for BufferedScheduler {
    async fn schedule(&self, batch: PushBatch) -> LobbyResult<()> {
        let max_batch = self.config.max_batch.max(1);
        let mut full = Vec::new();

        {
            let mut queues = self.queues.lock();
            for sid in &batch.session_ids {
                let queue = queues.entry(*sid).or_default();
                queue.push(batch.message.clone());
                if queue.len() >= max_batch {
                    if let Some(messages) = queues.remove(sid) {
                        full.push((*sid, messages));
                    }
                }
            }
        }

        for (sid, messages) in full {
            deliver(&self.sessions, sid, messages);
        }

        next_tick().await;
        Ok(())
    }

    async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("Buffered scheduler is already running");
            return;
        }

        let handle = tokio::spawn(run_flush_loop(
            self.sessions.clone(),
            self.queues.clone(),
            self.running.clone(),
            self.config.flush_interval,
        ));
        *self.task.lock() = Some(handle);

        tracing::info!(
            flush_interval_ms = self.config.flush_interval.as_millis(),
            max_batch = self.config.max_batch,
            "Buffered scheduler started"
        );
    }

    async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }

        let flushed = self.flush();
        tracing::info!(flushed, "Buffered scheduler stopped");
    }
}

impl Drop for BufferedScheduler {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for BufferedScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedScheduler")
            .field("config", &self.config)
            .field("pending_sessions", &self.queues.lock().len())
            .field("running", &self.is_running())
            .finish()
    }
}
