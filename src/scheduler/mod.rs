//! Periodic polling of probes, one independent unit per probe.

mod poller;

pub use poller::{poll_once, PollScheduler, ZeroIntervalError};
