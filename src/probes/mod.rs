pub mod base;
pub mod cpu_probe;
pub mod load_probe;
pub mod memory_probe;
pub mod procfs;
pub mod values;

// Re-export the primary Probe items so code outside can do
// "use crate::probes::{Probe, create_probe};"
pub use base::{create_probe, Probe, ProbeConfig, ProbeError, ProcProbeConfig};
pub use values::FieldValues;

#[cfg(any(test, feature = "test-util"))]
pub mod test_probe;
