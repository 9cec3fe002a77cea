use std::collections::HashSet;
use std::sync::Arc;

use prometheus::core::Collector;
use prometheus::{Encoder, IntCounter, Opts, Registry, TextEncoder};
use thiserror::Error;
use tracing::info;

use super::accessor::{FieldAccessor, LazyGauge, UptimeAccessor};
use crate::probes::Probe;

/// Startup-time registration failures. Any of these is a configuration defect.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("metric '{key}' is already registered")]
    Duplicate { key: String },

    #[error("metric '{key}' was rejected: {source}")]
    Rejected {
        key: String,
        #[source]
        source: prometheus::Error,
    },
}

/// The exported name for a probe field.
pub fn metric_key(probe: &str, field: &str) -> String {
    format!("{}_{}", probe, field)
}

/// Collects probe metrics during startup. Consumed by [`finish`](Self::finish).
pub struct MetricRegistryBuilder {
    registry: Registry,
    keys: HashSet<String>,
    names: Vec<String>,
    probes: Vec<Arc<dyn Probe>>,
}

impl Default for MetricRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricRegistryBuilder {
    pub fn new() -> Self {
        MetricRegistryBuilder {
            registry: Registry::new(),
            keys: HashSet::new(),
            names: Vec::new(),
            probes: Vec::new(),
        }
    }

    /// Registers `<probe>_errors`, `<probe>_uptime` and one lazy gauge per field.
    ///
    /// Every key of the probe is checked before anything is registered, so a
    /// failed call leaves the registry untouched. Returns the error counter the
    /// probe's poll unit increments.
    pub fn register_probe(
        &mut self,
        probe: Arc<dyn Probe>,
    ) -> Result<IntCounter, RegistrationError> {
        let name = probe.get_name().to_string();
        let fields = probe.get_fields();

        let errors_key = metric_key(&name, "errors");
        let uptime_key = metric_key(&name, "uptime");
        let mut pending = HashSet::new();
        for key in [&errors_key, &uptime_key]
            .into_iter()
            .cloned()
            .chain(fields.iter().map(|f| metric_key(&name, f)))
        {
            if self.keys.contains(&key) || !pending.insert(key.clone()) {
                return Err(RegistrationError::Duplicate { key });
            }
        }

        let rejected = |key: &str| {
            let key = key.to_string();
            move |source| RegistrationError::Rejected { key, source }
        };

        let errors = IntCounter::with_opts(
            Opts::new("errors", format!("Errors for probe({})", name)).subsystem(name.as_str()),
        )
        .map_err(rejected(&errors_key))?;

        let uptime = LazyGauge::new(
            Opts::new("uptime", format!("Uptime in seconds for {}", name))
                .subsystem(name.as_str()),
            UptimeAccessor::new(probe.clone()),
        )
        .map_err(rejected(&uptime_key))?;

        let mut collectors: Vec<(String, Box<dyn Collector>)> = vec![
            (errors_key, Box::new(errors.clone()) as Box<dyn Collector>),
            (uptime_key, Box::new(uptime) as Box<dyn Collector>),
        ];
        for field in &fields {
            let key = metric_key(&name, field);
            let gauge = LazyGauge::new(
                Opts::new(field.as_str(), format!("{} as reported by {}", field, name))
                    .subsystem(name.as_str()),
                FieldAccessor::new(probe.clone(), field.as_str()),
            )
            .map_err(rejected(&key))?;
            collectors.push((key, Box::new(gauge) as Box<dyn Collector>));
        }

        for (key, collector) in collectors {
            info!("Registering metric for '{}'", key);
            self.registry.register(collector).map_err(rejected(&key))?;
            self.keys.insert(key.clone());
            self.names.push(key);
        }

        self.probes.push(probe);
        Ok(errors)
    }

    /// Ends the registration phase.
    pub fn finish(self) -> MetricRegistry {
        MetricRegistry {
            registry: self.registry,
            names: self.names,
            probes: self.probes,
        }
    }
}

/// Read-only view of every registered metric.
pub struct MetricRegistry {
    registry: Registry,
    names: Vec<String>,
    probes: Vec<Arc<dyn Probe>>,
}

impl MetricRegistry {
    /// Evaluates every accessor and renders all metrics in Prometheus text format.
    pub fn render(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }

    /// Fully qualified names in registration order.
    pub fn metric_names(&self) -> &[String] {
        &self.names
    }

    pub fn probes(&self) -> &[Arc<dyn Probe>] {
        &self.probes
    }
}
