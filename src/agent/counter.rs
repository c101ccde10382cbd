//! The cooperative counter agent.
//!
//! Each tick the agent reads its flags once, publishes the current counter
//! to the observer and waits for the acknowledgement, applies one step in
//! the snapshotted direction, then sleeps. Commands only flip flags, so a
//! command issued mid-tick takes effect on the next one.

use crate::agent::observer::ObserverHandle;
use crate::error::AgentError;
use crate::models::{AgentReport, AgentState, Command, Direction, StopSource};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const RUNNING: u8 = 0;
const STOPPED_MANUAL: u8 = 1;
const STOPPED_WATCHDOG: u8 = 2;

/// Configuration for the agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Sleep between two ticks.
    pub tick: Duration,
    pub start_counter: i64,
}

/// Flags shared between the loop and its controllers. Each field is set on
/// its own; nothing relies on two of them changing together.
#[derive(Debug)]
struct Shared {
    status: AtomicU8,
    decrementing: AtomicBool,
    counter: AtomicI64,
}

impl Shared {
    fn running(&self) -> bool {
        self.status.load(Ordering::SeqCst) == RUNNING
    }

    fn direction(&self) -> Direction {
        if self.decrementing.load(Ordering::SeqCst) {
            Direction::Decrement
        } else {
            Direction::Increment
        }
    }

    fn stopped_by(&self) -> Option<StopSource> {
        match self.status.load(Ordering::SeqCst) {
            STOPPED_MANUAL => Some(StopSource::Manual),
            STOPPED_WATCHDOG => Some(StopSource::Watchdog),
            _ => None,
        }
    }
}

/// Cloneable command surface of a running agent.
#[derive(Debug, Clone)]
pub struct AgentControl {
    shared: Arc<Shared>,
}

impl AgentControl {
    /// Count upwards from the next tick on. No-op once stopped.
    pub fn increment(&self) -> bool {
        self.set_direction(Direction::Increment)
    }

    /// Count downwards from the next tick on. No-op once stopped.
    pub fn decrement(&self) -> bool {
        self.set_direction(Direction::Decrement)
    }

    /// Request a manual stop. Returns false if the agent was already stopped.
    pub fn stop(&self) -> bool {
        self.stop_from(StopSource::Manual)
    }

    /// Request a stop on behalf of `source`. Only the first request wins.
    pub fn stop_from(&self, source: StopSource) -> bool {
        let code = match source {
            StopSource::Manual => STOPPED_MANUAL,
            StopSource::Watchdog => STOPPED_WATCHDOG,
        };
        let stopped = self
            .shared
            .status
            .compare_exchange(RUNNING, code, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();

        if stopped {
            debug!("Stop requested by {}", source);
        }
        stopped
    }

    /// Dispatch a parsed command.
    pub fn apply(&self, command: Command) -> bool {
        match command {
            Command::Increment => self.increment(),
            Command::Decrement => self.decrement(),
            Command::Stop => self.stop(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running()
    }

    /// Point-in-time view: the counter value the next tick will publish.
    pub fn state(&self) -> AgentState {
        AgentState {
            counter: self.shared.counter.load(Ordering::SeqCst),
            direction: self.shared.direction(),
            running: self.shared.running(),
        }
    }

    fn set_direction(&self, direction: Direction) -> bool {
        if !self.shared.running() {
            return false;
        }
        self.shared
            .decrementing
            .store(direction == Direction::Decrement, Ordering::SeqCst);
        true
    }
}

/// The counter agent, ready to be spawned.
pub struct CounterAgent {
    config: AgentConfig,
    observer: ObserverHandle,
    shared: Arc<Shared>,
}

impl CounterAgent {
    pub fn new(config: AgentConfig, observer: ObserverHandle) -> Self {
        let shared = Arc::new(Shared {
            status: AtomicU8::new(RUNNING),
            decrementing: AtomicBool::new(false),
            counter: AtomicI64::new(config.start_counter),
        });

        Self {
            config,
            observer,
            shared,
        }
    }

    /// Command surface, usable before and after spawning.
    pub fn control(&self) -> AgentControl {
        AgentControl {
            shared: self.shared.clone(),
        }
    }

    /// Start the tick loop on the runtime.
    pub fn spawn(self) -> AgentHandle {
        let control = self.control();
        info!(
            "Starting counter agent at {} with a {:?} tick",
            self.config.start_counter, self.config.tick
        );
        AgentHandle {
            control,
            task: tokio::spawn(self.run()),
        }
    }

    async fn run(self) -> AgentReport {
        let mut counter = self.config.start_counter;
        let mut direction = Direction::default();
        let mut ticks = 0u64;
        let mut published = 0u64;
        let mut failed_publishes = 0u64;

        loop {
            if !self.shared.running() {
                break;
            }
            direction = self.shared.direction();
            ticks += 1;

            match self.observer.publish(counter).await {
                Ok(()) => published += 1,
                Err(e) => {
                    failed_publishes += 1;
                    warn!("Tick {}: value {} was not observed: {}", ticks, counter, e);
                }
            }

            let next = counter.saturating_add(direction.step());
            if next == counter {
                warn!("Counter is pinned at {}, cannot move {}", counter, direction);
            }
            counter = next;
            self.shared.counter.store(counter, Ordering::SeqCst);

            tokio::time::sleep(self.config.tick).await;
        }

        let stopped_by = self.shared.stopped_by();
        info!(
            "Counter agent halted at {} after {} ticks ({})",
            counter,
            ticks,
            stopped_by.map_or_else(|| "unknown".to_string(), |s| s.to_string())
        );

        AgentReport {
            ticks,
            published,
            failed_publishes,
            final_counter: counter,
            final_direction: direction,
            stopped_by,
        }
    }
}

/// A spawned agent.
pub struct AgentHandle {
    control: AgentControl,
    task: JoinHandle<AgentReport>,
}

impl AgentHandle {
    pub fn control(&self) -> AgentControl {
        self.control.clone()
    }

    pub fn state(&self) -> AgentState {
        self.control.state()
    }

    /// Wait for the loop to halt.
    pub async fn join(self) -> Result<AgentReport, AgentError> {
        self.task.await.map_err(|e| AgentError::Join(e.to_string()))
    }
}
