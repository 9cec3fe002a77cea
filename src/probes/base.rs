use std::path::PathBuf;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{cpu_probe::CpuProbe, load_probe::LoadProbe, memory_probe::MemoryProbe};

/// Errors a probe can report, either once during `init` or on every update cycle.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe '{probe}' failed to initialise: {reason}")]
    Init { probe: String, reason: String },

    #[error("probe '{probe}' failed to update: {reason}")]
    Update { probe: String, reason: String },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A pluggable measurement source.
///
/// `init` runs exactly once, before the probe is shared with its poll unit
/// and the metric registry. After that the probe is only reached through
/// `&self`, so `get_value` and `update_values` may run concurrently and the
/// probe is responsible for its own synchronization.
pub trait Probe: Send + Sync {
    fn init(&mut self) -> Result<(), ProbeError>;
    fn get_name(&self) -> &str;
    fn get_type(&self) -> &str;
    /// Field names exposed by this probe. Must not change after `init`.
    fn get_fields(&self) -> Vec<String>;
    /// Most recently computed value for `field`, `NaN` for an unknown field.
    fn get_value(&self, field: &str) -> f64;
    fn update_values(&self) -> Result<(), ProbeError>;
    /// Time since `init` succeeded, zero before.
    fn get_uptime(&self) -> Duration;
}

/// Configuration options for each probe, selected by the "type" tag.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone)]
#[serde(tag = "type")]
pub enum ProbeConfig {
    #[serde(rename = "cpu")]
    Cpu(ProcProbeConfig),
    #[serde(rename = "memory")]
    Memory(ProcProbeConfig),
    #[serde(rename = "load")]
    Load(ProcProbeConfig),
}

impl ProbeConfig {
    /// The probe set used when the configuration does not list any.
    pub fn default_set() -> Vec<ProbeConfig> {
        vec![
            ProbeConfig::Cpu(ProcProbeConfig::default()),
            ProbeConfig::Memory(ProcProbeConfig::default()),
            ProbeConfig::Load(ProcProbeConfig::default()),
        ]
    }
}

/// Settings shared by the procfs-backed probes.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone)]
pub struct ProcProbeConfig {
    /// Overrides the probe name, which prefixes every metric it exports.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_proc_root")]
    pub proc_root: PathBuf,
}

impl Default for ProcProbeConfig {
    fn default() -> Self {
        ProcProbeConfig {
            name: None,
            proc_root: default_proc_root(),
        }
    }
}

fn default_proc_root() -> PathBuf {
    PathBuf::from("/proc")
}

/// Create a probe from a given config. The probe is not initialised yet.
pub fn create_probe(config: &ProbeConfig) -> Box<dyn Probe> {
    match config {
        ProbeConfig::Cpu(cfg) => Box::new(CpuProbe::new(cfg)),
        ProbeConfig::Memory(cfg) => Box::new(MemoryProbe::new(cfg)),
        ProbeConfig::Load(cfg) => Box::new(LoadProbe::new(cfg)),
    }
}
