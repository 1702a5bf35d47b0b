//! Idle watchdog: flags a message as unresponsive when no step shows up in time.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::store::StepStore;

/// Presentation-only timer. It never cancels the run.
///
/// The timer outlives the run: only an appended step disarms it, so a run
/// that ends before producing any step still gets flagged.
#[derive(Debug)]
pub struct IdleWatchdog {
    flag: Arc<watch::Sender<bool>>,
    disarm: CancellationToken,
}

impl IdleWatchdog {
    /// Start the timer for `message_id`.
    ///
    /// When `bound` elapses while the message's Step Log is still empty and no
    /// step was reported through [`IdleWatchdog::step_appended`], the flag
    /// becomes `true`.
    pub fn arm(
        bound: Duration,
        store: Arc<dyn StepStore>,
        message_id: String,
    ) -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        let flag = Arc::new(tx);
        let disarm = CancellationToken::new();

        let task_flag = flag.clone();
        let task_disarm = disarm.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = task_disarm.cancelled() => return,
                _ = tokio::time::sleep(bound) => {}
            }
            if store.step_count(&message_id).await > 0 {
                return;
            }
            let flipped = task_flag.send_if_modified(|unresponsive| {
                if task_disarm.is_cancelled() || *unresponsive {
                    return false;
                }
                *unresponsive = true;
                true
            });
            if flipped {
                tracing::debug!(message_id = %message_id, ?bound, "message unresponsive");
            }
        });

        (Self { flag, disarm }, rx)
    }

    /// A watchdog that never fires, for messages that already have steps.
    pub fn disarmed() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        let disarm = CancellationToken::new();
        disarm.cancel();
        (
            Self {
                flag: Arc::new(tx),
                disarm,
            },
            rx,
        )
    }

    /// Cancel the timer and clear the flag.
    pub fn step_appended(&self) {
        self.disarm.cancel();
        self.flag.send_if_modified(|unresponsive| std::mem::replace(unresponsive, false));
    }

    pub fn is_unresponsive(&self) -> bool {
        *self.flag.borrow()
    }
}
