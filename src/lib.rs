//! Library exports for sysmond, shared between the binary and tests.

pub mod config;
pub mod metrics;
pub mod probes;
pub mod routes;
pub mod scheduler;
pub mod startup;
pub mod state;
pub mod utils;
