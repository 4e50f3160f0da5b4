/// Supervision utilities for actor operations
///
/// Provides the self-addressed one-shot timers that drive elevator motion,
/// and the timeout that bounds a connect attempt.
use futures::SinkExt;
use futures_channel::mpsc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Handle to a pending tick
///
/// When dropped or explicitly cancelled, the timer task will not deliver its
/// message, so a tick armed in a state that has since been left can never
/// fire into the next one.
pub struct TickHandle {
    token: u64,
    cancelled: Arc<AtomicBool>,
    task: tokio::task::JoinHandle<()>,
}

impl TickHandle {
    /// Token carried by the tick message this handle will deliver
    pub fn token(&self) -> u64 {
        self.token
    }

    /// Cancel the tick, preventing it from firing
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.task.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        // Auto-cancel when handle is dropped
        self.cancel();
    }
}

impl std::fmt::Debug for TickHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickHandle")
            .field("token", &self.token)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Timeout configuration for supervised operations
#[derive(Debug, Clone)]
pub struct SupervisionConfig {
    /// Timeout for one resolve-and-connect attempt
    pub connect_timeout_secs: u64,
}

impl Default for SupervisionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10, // 10s covers DNS plus a SYN retry
        }
    }
}

impl SupervisionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Spawn a task that sends `msg` to `tx` after `delay`
///
/// Returns a TickHandle that can be used to cancel the tick. If the handle is
/// dropped or cancelled before the delay elapses, nothing is sent.
pub fn spawn_tick<M>(tx: mpsc::Sender<M>, token: u64, msg: M, delay: Duration) -> TickHandle
where
    M: Send + 'static,
{
    let cancelled = Arc::new(AtomicBool::new(false));
    let cancel_flag = cancelled.clone();

    let task = tokio::spawn(async move {
        tokio::time::sleep(delay).await;

        // Final check before sending the tick
        if !cancel_flag.load(Ordering::Acquire) {
            let mut tx = tx;
            let _ = tx.send(msg).await;
        }
    });

    TickHandle {
        token,
        cancelled,
        task,
    }
}
