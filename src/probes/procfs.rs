//! Small helpers for reading Linux procfs files under a configurable root.

use std::path::Path;

use super::ProbeError;

pub fn read_proc_file(root: &Path, name: &str) -> Result<String, ProbeError> {
    let path = root.join(name);
    std::fs::read_to_string(&path).map_err(|source| ProbeError::Io { path, source })
}

/// Turn a failed read or parse during `init` into the fatal init error.
pub fn init_error(probe: &str, err: impl std::fmt::Display) -> ProbeError {
    ProbeError::Init {
        probe: probe.to_string(),
        reason: err.to_string(),
    }
}

pub fn update_error(probe: &str, err: impl std::fmt::Display) -> ProbeError {
    ProbeError::Update {
        probe: probe.to_string(),
        reason: err.to_string(),
    }
}
