//! Live, snapshot-carrying subscriptions over the session collection.
//!
//! A feed delivers the full current list for its scope, newest first, once
//! on start and again after every in-scope write. Updates are complete
//! snapshots, never diffs, and arrive in the order they were produced.
//! Writes from other processes sharing the database are noticed by polling
//! the repository's change cursor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Duration;

use activator_core::model::{SessionId, SessionRecord, UserId};
use storage::repository::{SessionRepository, SessionScope, StorageError};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::FeedConfig;
use crate::error::FeedError;

/// Published by the store after every successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionChange {
    pub id: SessionId,
    pub submitted_by: UserId,
}

/// One delivery on a feed.
#[derive(Debug)]
pub enum FeedUpdate {
    Snapshot(Vec<SessionRecord>),
    /// Terminal: the feed stops after this and does not reconnect.
    Failed(FeedError),
}

/// Consumer end of a live subscription.
///
/// Dropping the feed, or calling [`SessionFeed::cancel`], stops the
/// background task and releases its change listener.
#[derive(Debug)]
pub struct SessionFeed {
    updates: mpsc::Receiver<FeedUpdate>,
    task: JoinHandle<()>,
}

impl SessionFeed {
    pub(crate) fn spawn(
        sessions: Arc<dyn SessionRepository>,
        scope: SessionScope,
        settings: &FeedConfig,
        changes: broadcast::Receiver<SessionChange>,
    ) -> Self {
        let (tx, updates) = mpsc::channel(settings.buffer);
        let task = tokio::spawn(run_feed(
            sessions,
            scope,
            settings.recent_limit,
            settings.poll_interval(),
            changes,
            tx,
        ));
        Self { updates, task }
    }

    /// Waits for the next update. `None` once the feed has ended.
    pub async fn next(&mut self) -> Option<FeedUpdate> {
        self.updates.recv().await
    }

    /// Stops the subscription. Nothing is delivered afterwards.
    pub fn cancel(mut self) {
        self.updates.close();
        self.task.abort();
    }
}

impl Drop for SessionFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_feed(
    sessions: Arc<dyn SessionRepository>,
    scope: SessionScope,
    limit: u32,
    poll_every: Duration,
    mut changes: broadcast::Receiver<SessionChange>,
    tx: mpsc::Sender<FeedUpdate>,
) {
    let mut poll = time::interval_at(Instant::now() + poll_every, poll_every);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // Cursor first: a write landing between the two reads moves it again
        // and is picked up by the next poll.
        let refreshed = match sessions.change_cursor(&scope).await {
            Ok(cursor) => sessions
                .list_recent(&scope, limit)
                .await
                .map(|snapshot| (cursor, snapshot)),
            Err(err) => Err(err),
        };
        let (seen, snapshot) = match refreshed {
            Ok(refreshed) => refreshed,
            Err(err) => return fail(&tx, &scope, err).await,
        };
        tracing::debug!(?scope, records = snapshot.len(), cursor = seen, "feed snapshot");
        if tx.send(FeedUpdate::Snapshot(snapshot)).await.is_err() {
            return;
        }

        // Park until a write lands in scope or the consumer goes away. Local
        // writes arrive on the broadcast; other processes show up in the poll.
        loop {
            tokio::select! {
                () = tx.closed() => return,
                change = changes.recv() => match change {
                    Ok(change) if scope.matches(&change.submitted_by) => break,
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "feed lagged; refreshing");
                        break;
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                },
                _ = poll.tick() => match sessions.change_cursor(&scope).await {
                    Ok(cursor) if cursor != seen => break,
                    Ok(_) => {}
                    Err(err) => return fail(&tx, &scope, err).await,
                },
            }
        }
    }
}

async fn fail(tx: &mpsc::Sender<FeedUpdate>, scope: &SessionScope, err: StorageError) {
    tracing::warn!(?scope, error = %err, "feed query failed");
    let _ = tx.send(FeedUpdate::Failed(FeedError(err))).await;
}

/// Serializes callback runs against cancellation.
#[derive(Debug)]
struct DeliveryGate {
    open: AtomicBool,
    delivery: Mutex<()>,
    delivering_on: Mutex<Option<ThreadId>>,
}

impl DeliveryGate {
    fn new() -> Self {
        Self {
            open: AtomicBool::new(true),
            delivery: Mutex::new(()),
            delivering_on: Mutex::new(None),
        }
    }

    /// Runs `deliver` unless closed. Returns whether the gate is still open.
    fn pass(&self, deliver: impl FnOnce()) -> bool {
        let _delivery = self.delivery.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.open.load(Ordering::Acquire) {
            return false;
        }
        self.mark_delivering(Some(thread::current().id()));
        deliver();
        self.mark_delivering(None);
        self.open.load(Ordering::Acquire)
    }

    fn close(&self) {
        self.open.store(false, Ordering::Release);
        let delivering_on = *self
            .delivering_on
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // From inside the callback the delivery lock is already held by this
        // thread; the closed flag stops the loop once the callback returns.
        if delivering_on != Some(thread::current().id()) {
            drop(self.delivery.lock().unwrap_or_else(PoisonError::into_inner));
        }
    }

    fn mark_delivering(&self, thread: Option<ThreadId>) {
        *self
            .delivering_on
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = thread;
    }
}

/// Cancellation handle for a callback subscription.
///
/// Once [`FeedHandle::cancel`] returns the callback will not run again,
/// even if an update was already in flight. The callback may cancel its own
/// handle.
#[derive(Debug)]
pub struct FeedHandle {
    gate: Arc<DeliveryGate>,
    task: JoinHandle<()>,
}

impl FeedHandle {
    pub(crate) fn spawn<F>(mut feed: SessionFeed, mut on_update: F) -> Self
    where
        F: FnMut(FeedUpdate) + Send + 'static,
    {
        let gate = Arc::new(DeliveryGate::new());
        let task_gate = Arc::clone(&gate);
        let task = tokio::spawn(async move {
            while let Some(update) = feed.next().await {
                if !task_gate.pass(|| on_update(update)) {
                    break;
                }
            }
        });
        Self { gate, task }
    }

    pub fn cancel(self) {
        self.close();
    }

    fn close(&self) {
        self.gate.close();
        self.task.abort();
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.close();
    }
}
