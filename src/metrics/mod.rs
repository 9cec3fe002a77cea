//! Metric registration and Prometheus text exposition.
//!
//! Probes are registered once, during startup, through
//! [`MetricRegistryBuilder`]. Finishing the builder yields a read-only
//! [`MetricRegistry`] that the HTTP layer renders on every scrape.

mod accessor;
mod registry;

pub use accessor::{Accessor, FieldAccessor, LazyGauge, UptimeAccessor};
pub use registry::{metric_key, MetricRegistry, MetricRegistryBuilder, RegistrationError};
