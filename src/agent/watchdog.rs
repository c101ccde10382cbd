//! One-shot watchdog for the counter agent.

use crate::agent::counter::AgentControl;
use crate::agent::observer::ObserverHandle;
use crate::error::AgentError;
use crate::models::{StopSource, WatchdogOutcome};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Sleeps once, then stops the agent and disables the observer's controls.
pub struct Watchdog {
    deadline: Duration,
    control: AgentControl,
    observer: ObserverHandle,
}

impl Watchdog {
    pub fn new(deadline: Duration, control: AgentControl, observer: ObserverHandle) -> Self {
        Self {
            deadline,
            control,
            observer,
        }
    }

    pub fn spawn(self) -> WatchdogHandle {
        let interrupt = Arc::new(Notify::new());
        debug!("Watchdog armed for {:?}", self.deadline);
        WatchdogHandle {
            interrupt: interrupt.clone(),
            task: tokio::spawn(self.run(interrupt)),
        }
    }

    async fn run(self, interrupt: Arc<Notify>) -> WatchdogOutcome {
        let started = Instant::now();

        let interrupted = tokio::select! {
            _ = tokio::time::sleep(self.deadline) => false,
            _ = interrupt.notified() => {
                warn!(
                    "Watchdog sleep interrupted after {:?}, stopping the agent anyway",
                    started.elapsed()
                );
                true
            }
        };

        // Fires whether the sleep completed or not.
        let stopped_agent = self.control.stop_from(StopSource::Watchdog);
        if stopped_agent {
            info!("Watchdog stopped the agent");
        } else {
            debug!("Agent was already stopped when the watchdog fired");
        }
        self.observer.disable_controls().await;

        WatchdogOutcome {
            interrupted,
            stopped_agent,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// A spawned watchdog.
pub struct WatchdogHandle {
    interrupt: Arc<Notify>,
    task: JoinHandle<WatchdogOutcome>,
}

impl WatchdogHandle {
    /// Trigger that cuts the sleep short. The watchdog still stops the agent.
    pub fn interrupter(&self) -> Arc<Notify> {
        self.interrupt.clone()
    }

    pub async fn join(self) -> Result<WatchdogOutcome, AgentError> {
        self.task
            .await
            .map_err(|e| AgentError::WatchdogJoin(e.to_string()))
    }

    /// Disarm a watchdog that has not fired yet and wait until it is gone.
    pub async fn disarm(self) {
        self.task.abort();
        if let Ok(outcome) = self.task.await {
            debug!("Watchdog fired before it could be disarmed: {:?}", outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::counter::{AgentConfig, CounterAgent};
    use crate::agent::observer::{self, ObserverEvent};
    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;
    use tokio_test::assert_ok;

    /// Acknowledges every publish; resolves to (values, controls disabled).
    fn auto_observer(mut rx: mpsc::Receiver<ObserverEvent>) -> JoinHandle<(Vec<i64>, bool)> {
        tokio::spawn(async move {
            let mut values = Vec::new();
            let mut disabled = false;
            while let Some(event) = rx.recv().await {
                match event {
                    ObserverEvent::Publish { value, ack } => {
                        values.push(value);
                        let _ = ack.send(Ok(()));
                    }
                    ObserverEvent::ControlsDisabled => disabled = true,
                }
            }
            (values, disabled)
        })
    }

    fn fast_config() -> AgentConfig {
        AgentConfig {
            tick: Duration::from_millis(1),
            start_counter: 0,
        }
    }

    #[tokio::test]
    async fn test_deadline_stops_the_agent() {
        let (handle, rx) = observer::channel(4);
        let observer = auto_observer(rx);

        let agent = CounterAgent::new(fast_config(), handle.clone()).spawn();
        let watchdog =
            Watchdog::new(Duration::from_millis(30), agent.control(), handle).spawn();

        let outcome = assert_ok!(watchdog.join().await);
        assert!(!outcome.interrupted);
        assert!(outcome.stopped_agent);
        assert!(outcome.elapsed_ms >= 30);

        let report = assert_ok!(agent.join().await);
        assert_eq!(report.stopped_by, Some(StopSource::Watchdog));

        let (values, disabled) = observer.await.unwrap();
        assert!(disabled);
        assert!(!values.is_empty());
        let expected: Vec<i64> = (0..values.len() as i64).collect();
        assert_eq!(values, expected);
    }

    #[tokio::test]
    async fn test_manual_stop_makes_watchdog_a_noop() {
        let (handle, rx) = observer::channel(4);
        let observer = auto_observer(rx);

        let agent = CounterAgent::new(fast_config(), handle.clone()).spawn();
        let watchdog =
            Watchdog::new(Duration::from_millis(20), agent.control(), handle).spawn();

        assert!(agent.control().stop());
        let report = assert_ok!(agent.join().await);
        assert_eq!(report.stopped_by, Some(StopSource::Manual));

        let outcome = assert_ok!(watchdog.join().await);
        assert!(!outcome.stopped_agent);

        let (_, disabled) = observer.await.unwrap();
        assert!(disabled);
    }

    #[tokio::test]
    async fn test_interrupted_sleep_still_stops() {
        let (handle, rx) = observer::channel(4);
        let observer = auto_observer(rx);

        let agent = CounterAgent::new(fast_config(), handle.clone()).spawn();
        let watchdog =
            Watchdog::new(Duration::from_secs(3600), agent.control(), handle).spawn();

        watchdog.interrupter().notify_one();

        let outcome = assert_ok!(watchdog.join().await);
        assert!(outcome.interrupted);
        assert!(outcome.stopped_agent);
        assert!(outcome.elapsed_ms < 3_600_000);

        let report = assert_ok!(agent.join().await);
        assert_eq!(report.stopped_by, Some(StopSource::Watchdog));
        let (_, disabled) = observer.await.unwrap();
        assert!(disabled);
    }

    #[tokio::test]
    async fn test_disarmed_watchdog_releases_the_observer() {
        let (handle, rx) = observer::channel(4);
        let observer = auto_observer(rx);

        let agent = CounterAgent::new(fast_config(), handle.clone()).spawn();
        let watchdog =
            Watchdog::new(Duration::from_secs(3600), agent.control(), handle).spawn();

        assert!(agent.control().stop());
        assert_ok!(agent.join().await);
        watchdog.disarm().await;

        // Every sender is gone, so the observer drains and returns.
        let (_, disabled) = observer.await.unwrap();
        assert!(!disabled);
    }

    #[tokio::test]
    async fn test_interrupter_from_another_task() {
        let (handle, rx) = observer::channel(4);
        let _observer = auto_observer(rx);

        let agent = CounterAgent::new(fast_config(), handle.clone()).spawn();
        let watchdog =
            Watchdog::new(Duration::from_secs(3600), agent.control(), handle).spawn();

        let trigger = watchdog.interrupter();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            trigger.notify_one();
        });

        let outcome = assert_ok!(watchdog.join().await);
        assert!(outcome.interrupted);
        assert!(!agent.state().running);
    }
}
