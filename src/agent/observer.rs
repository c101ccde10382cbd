//! The observer side of the counter agent.
//!
//! Publishing is a synchronous hand-off: the agent sends the value together
//! with a oneshot acknowledgement and waits on it, so it can never run ahead
//! of a slow observer and the observer never sees two values merged.

use crate::error::PublishError;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

/// Events delivered to an observer.
#[derive(Debug)]
pub enum ObserverEvent {
    /// A counter value. The observer must answer on `ack` once it has applied it.
    Publish {
        value: i64,
        ack: oneshot::Sender<Result<(), PublishError>>,
    },
    /// No further commands will be accepted; disable whatever issues them.
    ControlsDisabled,
}

/// Sending half held by the agent and the watchdog.
#[derive(Debug, Clone)]
pub struct ObserverHandle {
    tx: mpsc::Sender<ObserverEvent>,
}

/// Create an observer channel.
pub fn channel(buffer: usize) -> (ObserverHandle, mpsc::Receiver<ObserverEvent>) {
    let (tx, rx) = mpsc::channel(buffer);
    (ObserverHandle { tx }, rx)
}

impl ObserverHandle {
    /// Hand `value` to the observer and wait until it has been applied.
    pub async fn publish(&self, value: i64) -> Result<(), PublishError> {
        let (ack, applied) = oneshot::channel();
        self.tx
            .send(ObserverEvent::Publish { value, ack })
            .await
            .map_err(|_| PublishError::ObserverGone)?;

        applied.await.map_err(|_| PublishError::ObserverGone)?
    }

    /// Tell the observer to stop offering commands.
    pub async fn disable_controls(&self) {
        if self.tx.send(ObserverEvent::ControlsDisabled).await.is_err() {
            debug!("Observer gone before controls could be disabled");
        }
    }
}

/// Renders published values on the terminal with a spinner.
pub struct TerminalObserver {
    bar: ProgressBar,
    controls_enabled: Arc<AtomicBool>,
    task: JoinHandle<Option<i64>>,
}

impl TerminalObserver {
    /// Start consuming `events`. With `visible == false` nothing is drawn.
    pub fn spawn(mut events: mpsc::Receiver<ObserverEvent>, visible: bool) -> Self {
        let bar = if visible {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        } else {
            ProgressBar::hidden()
        };

        let controls_enabled = Arc::new(AtomicBool::new(true));

        let task = {
            let bar = bar.clone();
            let controls_enabled = controls_enabled.clone();
            tokio::spawn(async move {
                let mut last = None;
                while let Some(event) = events.recv().await {
                    match event {
                        ObserverEvent::Publish { value, ack } => {
                            bar.set_message(format!("counter: {value}"));
                            last = Some(value);
                            // The agent may have given up waiting; nothing to do then.
                            let _ = ack.send(Ok(()));
                        }
                        ObserverEvent::ControlsDisabled => {
                            controls_enabled.store(false, Ordering::SeqCst);
                            let shown = last.map_or_else(|| "-".to_string(), |v| v.to_string());
                            bar.set_message(format!("counter: {shown} (controls disabled)"));
                        }
                    }
                }
                last
            })
        };

        Self {
            bar,
            controls_enabled,
            task,
        }
    }

    /// Shared flag, false once controls have been disabled.
    pub fn controls(&self) -> Arc<AtomicBool> {
        self.controls_enabled.clone()
    }

    /// Stop drawing and return the last value the observer applied.
    ///
    /// Every other [`ObserverHandle`] must have been dropped, otherwise this
    /// waits for them.
    pub async fn finish(self) -> Option<i64> {
        let last = self.task.await.ok().flatten();
        self.bar.finish();
        last
    }
}
