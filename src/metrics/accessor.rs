//! Lazily evaluated gauges bound to probe state.

use std::sync::Arc;

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, Opts};

use crate::probes::Probe;

/// A zero-argument read of the current value behind a metric.
pub trait Accessor: Send + Sync + 'static {
    fn evaluate(&self) -> f64;
}

/// Reads one named field of a probe.
pub struct FieldAccessor {
    probe: Arc<dyn Probe>,
    field: String,
}

impl FieldAccessor {
    pub fn new(probe: Arc<dyn Probe>, field: impl Into<String>) -> Self {
        FieldAccessor {
            probe,
            field: field.into(),
        }
    }
}

impl Accessor for FieldAccessor {
    fn evaluate(&self) -> f64 {
        self.probe.get_value(&self.field)
    }
}

/// Reads a probe's uptime in seconds.
pub struct UptimeAccessor {
    probe: Arc<dyn Probe>,
}

impl UptimeAccessor {
    pub fn new(probe: Arc<dyn Probe>) -> Self {
        UptimeAccessor { probe }
    }
}

impl Accessor for UptimeAccessor {
    fn evaluate(&self) -> f64 {
        self.probe.get_uptime().as_secs_f64()
    }
}

/// A gauge whose value is pulled from its accessor at gather time.
pub struct LazyGauge<A: Accessor> {
    gauge: Gauge,
    accessor: A,
}

impl<A: Accessor> LazyGauge<A> {
    pub fn new(opts: Opts, accessor: A) -> prometheus::Result<Self> {
        Ok(LazyGauge {
            gauge: Gauge::with_opts(opts)?,
            accessor,
        })
    }

    pub fn evaluate(&self) -> f64 {
        self.accessor.evaluate()
    }
}

impl<A: Accessor> Collector for LazyGauge<A> {
    fn desc(&self) -> Vec<&Desc> {
        self.gauge.desc()
    }

    // Concurrent scrapes may interleave set/collect; each still emits one
    // complete sample of the field.
    fn collect(&self) -> Vec<MetricFamily> {
        self.gauge.set(self.evaluate());
        self.gauge.collect()
    }
}
