//! Manages the lifecycle of the background tasks (feed listener, persistence
//! writer and their heartbeats).
use futures::future::join_all;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// A centralized manager for all spawned tasks.
///
/// This struct is responsible for:
/// - Spawning tasks and keeping track of their `JoinHandle`s.
/// - Owning the shutdown signal and awaiting all tasks once it is sent.
#[derive(Clone, Debug)]
pub struct TaskManager {
    handles: Arc<Mutex<Vec<(&'static str, JoinHandle<()>)>>>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl TaskManager {
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            handles: Arc::new(Mutex::new(Vec::new())),
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        }
    }

    /// Spawns a new task and adds its handle to the manager.
    pub fn spawn<F>(&self, name: &'static str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        debug!(task_name = name, "Spawning task");
        let handle = tokio::spawn(future);
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name, handle));
    }

    /// Returns a clone of the shutdown receiver.
    pub fn get_shutdown_rx(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Signals shutdown and waits up to `grace` for all managed tasks.
    ///
    /// Tasks still running when the grace period ends are aborted.
    pub async fn shutdown(self, grace: Duration) {
        let _ = self.shutdown_tx.send(true);

        let handles = self
            .handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect::<Vec<_>>();
        info!(
            "TaskManager shutting down. Waiting for {} tasks to complete...",
            handles.len()
        );

        let task_names: Vec<&'static str> = handles.iter().map(|(name, _)| *name).collect();
        let aborts: Vec<_> = handles.iter().map(|(_, handle)| handle.abort_handle()).collect();

        let joined = tokio::time::timeout(
            grace,
            join_all(handles.into_iter().map(|(_, handle)| handle)),
        )
        .await;

        let results = match joined {
            Ok(results) => results,
            Err(_) => {
                warn!(tasks = ?task_names, "Tasks did not stop within {:?}, aborting.", grace);
                aborts.iter().for_each(|abort| abort.abort());
                return;
            }
        };

        let mut panicked = 0;
        for (task_name, result) in task_names.into_iter().zip(results) {
            match result {
                Ok(()) => debug!(task_name, "Task shut down gracefully."),
                Err(e) => {
                    error!(task_name, "Task panicked during shutdown: {}", e);
                    panicked += 1;
                }
            }
        }

        if panicked == 0 {
            info!("All tasks shut down gracefully.");
        }
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}
