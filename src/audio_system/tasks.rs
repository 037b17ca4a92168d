/// Cancellable background tasks
///
/// Preloading and duck releases run on short-lived threads keyed by what
/// they work on. Cancelling a task wakes any wait in progress and joins the
/// thread, so nothing scheduled runs after `cancel_all` returns.
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{after, bounded, select, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;

/// Identifies a pending task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKey {
    /// Opportunistic effect preloading
    Preload,

    /// Release of one duck request
    DuckRelease(u64),
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKey::Preload => write!(f, "preload"),
            TaskKey::DuckRelease(ticket) => write!(f, "duck-release-{ticket}"),
        }
    }
}

/// Handed to every task so it can notice cancellation
pub struct CancelToken {
    rx: Receiver<()>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        !matches!(self.rx.try_recv(), Err(TryRecvError::Empty))
    }

    /// Sleep for `delay`. Returns false if cancelled before it elapsed.
    pub fn wait(&self, delay: Duration) -> bool {
        if delay.is_zero() {
            return !self.is_cancelled();
        }
        select! {
            recv(self.rx) -> _ => false,
            recv(after(delay)) -> _ => true,
        }
    }
}

struct TaskEntry {
    id: u64,
    cancel: Sender<()>,
    thread: JoinHandle<()>,
}

type Entries = Arc<Mutex<HashMap<TaskKey, TaskEntry>>>;

/// Set of keyed background tasks
#[derive(Default)]
pub struct TaskSet {
    entries: Entries,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` on its own thread under `key`.
    ///
    /// A pending task with the same key is cancelled. Returns false once the
    /// set is closed or if the thread could not be started.
    pub fn spawn<F>(&self, key: TaskKey, task: F) -> bool
    where
        F: FnOnce(&CancelToken) + Send + 'static,
    {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (cancel_tx, cancel_rx) = bounded(1);
        let token = CancelToken { rx: cancel_rx };
        let entries = Arc::clone(&self.entries);

        // Held across spawn so the task cannot deregister before it is registered
        let mut map = self.entries.lock();
        let spawned = thread::Builder::new()
            .name(format!("audio-{key}"))
            .spawn(move || {
                task(&token);
                let mut map = entries.lock();
                if map.get(&key).is_some_and(|entry| entry.id == id) {
                    map.remove(&key);
                }
            });

        match spawned {
            Ok(thread) => {
                let entry = TaskEntry {
                    id,
                    cancel: cancel_tx,
                    thread,
                };
                if let Some(previous) = map.insert(key, entry) {
                    let _ = previous.cancel.try_send(());
                    tracing::debug!("Replaced pending task {}", key);
                }
                true
            }
            Err(e) => {
                tracing::warn!("Failed to start task {}: {}", key, e);
                false
            }
        }
    }

    /// Run `task` after `delay` unless cancelled first
    pub fn spawn_after<F>(&self, key: TaskKey, delay: Duration, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.spawn(key, move |token| {
            if token.wait(delay) {
                task();
            }
        })
    }

    /// Number of tasks that have not finished yet
    pub fn pending(&self) -> usize {
        self.entries.lock().len()
    }

    /// Cancel every pending task and wait for their threads to exit
    pub fn cancel_all(&self) {
        let drained: Vec<TaskEntry> = self.entries.lock().drain().map(|(_, e)| e).collect();
        if drained.is_empty() {
            return;
        }

        for entry in &drained {
            let _ = entry.cancel.try_send(());
        }

        let current = thread::current().id();
        for entry in drained {
            if entry.thread.thread().id() != current {
                let _ = entry.thread.join();
            }
        }
    }

    /// Cancel everything and refuse new tasks
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.cancel_all();
    }
}

impl Drop for TaskSet {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_delayed_task_runs() {
        let tasks = TaskSet::new();
        let (tx, rx) = bounded(1);

        assert!(tasks.spawn_after(TaskKey::DuckRelease(1), Duration::from_millis(10), move || {
            let _ = tx.send(());
        }));

        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
    }

    #[test]
    fn test_cancel_all_prevents_run() {
        let tasks = TaskSet::new();
        let ran = Arc::new(AtomicUsize::new(0));

        for ticket in 0..3 {
            let ran = Arc::clone(&ran);
            tasks.spawn_after(TaskKey::DuckRelease(ticket), Duration::from_secs(30), move || {
                ran.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(tasks.pending(), 3);

        tasks.cancel_all();
        assert_eq!(tasks.pending(), 0);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_same_key_replaces_pending_task() {
        let tasks = TaskSet::new();
        let ran = Arc::new(AtomicUsize::new(0));

        let first = Arc::clone(&ran);
        tasks.spawn_after(TaskKey::Preload, Duration::from_secs(30), move || {
            first.fetch_add(10, Ordering::SeqCst);
        });

        let (tx, rx) = bounded(1);
        let second = Arc::clone(&ran);
        tasks.spawn_after(TaskKey::Preload, Duration::from_millis(5), move || {
            second.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(());
        });

        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
        tasks.cancel_all();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_closed_set_rejects_tasks() {
        let tasks = TaskSet::new();
        tasks.close();
        assert!(!tasks.spawn(TaskKey::Preload, |_| {}));
    }

    #[test]
    fn test_token_observes_cancellation() {
        let tasks = TaskSet::new();
        let (started_tx, started_rx) = bounded(1);
        let (done_tx, done_rx) = bounded(1);

        tasks.spawn(TaskKey::Preload, move |token| {
            let _ = started_tx.send(());
            let finished = token.wait(Duration::from_secs(30));
            let _ = done_tx.send(finished);
        });

        started_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        tasks.cancel_all();
        assert_eq!(done_rx.recv_timeout(Duration::from_secs(2)), Ok(false));
    }
}
