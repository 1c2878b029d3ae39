use tokio::sync::watch;
use tokio::time::{interval, Duration};
use tracing::debug;

/// Logs a "heartbeat" message periodically until shutdown.
///
/// Each long-running task spawns one with a unique name. A heartbeat that
/// keeps logging after the shutdown signal points at a task that is not
/// respecting it.
pub async fn run_heartbeat(task_name: &'static str, mut shutdown_rx: watch::Receiver<bool>) {
    let mut timer = interval(Duration::from_secs(3));
    debug!("[Heartbeat] '{}' started.", task_name);
    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => {
                debug!("[Heartbeat] '{}' received shutdown. Exiting.", task_name);
                break;
            }
            _ = timer.tick() => {
                debug!("[Heartbeat] '{}' is alive.", task_name);
            }
        }
    }
}
