//! Counter agent, its watchdog and the observer protocol they publish to.

pub mod counter;
pub mod observer;
pub mod watchdog;

pub use counter::{AgentConfig, CounterAgent};
pub use observer::{ObserverHandle, TerminalObserver};
pub use watchdog::Watchdog;
