use crate::api::TaskStatus;
use crate::client::Backend;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Shared view of the backend's background task, refreshed by one poller.
#[derive(Clone)]
pub struct TaskStatusMonitor {
    backend: Arc<dyn Backend>,
    interval: Duration,
    status_tx: Arc<watch::Sender<TaskStatus>>,
    /// Set while a poll loop is active; prevents duplicate loops.
    running: Arc<AtomicBool>,
    /// Incremented on stop so a superseded loop notices and exits.
    cancel_token: Arc<AtomicU64>,
}

impl TaskStatusMonitor {
    pub fn new(backend: Arc<dyn Backend>, interval: Duration) -> Self {
        let (status_tx, _) = watch::channel(TaskStatus::default());
        Self {
            backend,
            interval: interval.max(Duration::from_millis(100)),
            status_tx: Arc::new(status_tx),
            running: Arc::new(AtomicBool::new(false)),
            cancel_token: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn status(&self) -> TaskStatus {
        self.status_tx.borrow().clone()
    }

    /// Whether the backend reports a task in progress.
    pub fn is_running(&self) -> bool {
        self.status_tx.borrow().is_running
    }

    pub fn subscribe(&self) -> watch::Receiver<TaskStatus> {
        self.status_tx.subscribe()
    }

    pub fn is_polling(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Fetch the status once. A failed poll keeps the last known status.
    pub async fn poll_once(&self) -> bool {
        match self.backend.task_status().await {
            Ok(status) => {
                self.status_tx.send_if_modified(|current| {
                    if *current == status {
                        false
                    } else {
                        *current = status;
                        true
                    }
                });
                true
            }
            Err(err) => {
                log::debug!("task status poll failed: {}", err);
                false
            }
        }
    }

    /// Claim the poll loop. Returns the cancel token, or `None` if a loop is
    /// already running.
    pub fn try_start(&self) -> Option<u64> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| self.cancel_token.load(Ordering::SeqCst))
    }

    /// Stop the running loop and allow a new one to start immediately.
    pub fn stop(&self) {
        self.cancel_token.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_cancelled(&self, token: u64) -> bool {
        self.cancel_token.load(Ordering::SeqCst) != token
    }

    fn mark_stopped(&self, token: u64) {
        if self.cancel_token.load(Ordering::SeqCst) == token {
            self.running.store(false, Ordering::SeqCst);
        }
    }

    /// Spawn the poll loop on the current tokio runtime.
    ///
    /// Returns `None` when a loop is already active.
    pub fn start(&self) -> Option<tokio::task::JoinHandle<()>> {
        let token = self.try_start()?;
        let monitor = self.clone();
        log::debug!("task status poller started (every {:?})", self.interval);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(monitor.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if monitor.is_cancelled(token) {
                    break;
                }
                monitor.poll_once().await;
            }
            monitor.mark_stopped(token);
            log::debug!("task status poller stopped");
        }))
    }
}
