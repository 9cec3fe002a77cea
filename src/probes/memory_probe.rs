use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use super::procfs::{init_error, read_proc_file, update_error};
use super::{FieldValues, ProbeError, ProcProbeConfig, Probe};

const FIELDS: &[&str] = &[
    "total_bytes",
    "free_bytes",
    "available_bytes",
    "used_pct",
    "swap_used_pct",
];

#[derive(Debug, Clone, Copy, PartialEq)]
struct MemInfo {
    total: u64,
    free: u64,
    available: u64,
    swap_total: u64,
    swap_free: u64,
}

impl MemInfo {
    /// Parses `/proc/meminfo`. Values there are in kB and converted to bytes.
    fn parse(meminfo: &str) -> Result<Self, String> {
        let mut entries: HashMap<&str, u64> = HashMap::new();
        for line in meminfo.lines() {
            let Some((key, rest)) = line.split_once(':') else {
                continue;
            };
            let Some(kb) = rest.split_whitespace().next().and_then(|v| v.parse::<u64>().ok())
            else {
                continue;
            };
            let bytes = kb
                .checked_mul(1024)
                .ok_or_else(|| format!("'{}' of {} kB overflows a byte count", key.trim(), kb))?;
            entries.insert(key.trim(), bytes);
        }

        let required = |key: &str| {
            entries
                .get(key)
                .copied()
                .ok_or_else(|| format!("missing '{}' in meminfo", key))
        };
        let optional = |key: &str| entries.get(key).copied().unwrap_or(0);

        let total = required("MemTotal")?;
        let free = required("MemFree")?;
        // Kernels before 3.14 have no MemAvailable.
        let available = match entries.get("MemAvailable") {
            Some(available) => *available,
            None => free
                .checked_add(optional("Buffers"))
                .and_then(|v| v.checked_add(optional("Cached")))
                .ok_or("estimated MemAvailable overflows")?,
        };

        Ok(MemInfo {
            total,
            free,
            available,
            swap_total: optional("SwapTotal"),
            swap_free: optional("SwapFree"),
        })
    }

    fn used_pct(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.total.saturating_sub(self.available) as f64 * 100.0 / self.total as f64
    }

    fn swap_used_pct(&self) -> f64 {
        if self.swap_total == 0 {
            return 0.0;
        }
        self.swap_total.saturating_sub(self.swap_free) as f64 * 100.0 / self.swap_total as f64
    }
}

/// Physical memory and swap usage.
pub struct MemoryProbe {
    name: String,
    proc_root: PathBuf,
    values: FieldValues,
    started_at: Option<Instant>,
}

impl MemoryProbe {
    pub fn new(config: &ProcProbeConfig) -> Self {
        MemoryProbe {
            name: config.name.clone().unwrap_or_else(|| "memory".to_string()),
            proc_root: config.proc_root.clone(),
            values: FieldValues::new(FIELDS),
            started_at: None,
        }
    }

    fn sample(&self) -> Result<MemInfo, String> {
        let meminfo = read_proc_file(&self.proc_root, "meminfo").map_err(|e| e.to_string())?;
        MemInfo::parse(&meminfo)
    }
}

impl Probe for MemoryProbe {
    fn init(&mut self) -> Result<(), ProbeError> {
        self.sample().map_err(|e| init_error(&self.name, e))?;
        self.started_at = Some(Instant::now());
        Ok(())
    }

    fn get_name(&self) -> &str {
        &self.name
    }

    fn get_type(&self) -> &str {
        "memory"
    }

    fn get_fields(&self) -> Vec<String> {
        self.values.names()
    }

    fn get_value(&self, field: &str) -> f64 {
        self.values.get(field)
    }

    fn update_values(&self) -> Result<(), ProbeError> {
        let info = self.sample().map_err(|e| update_error(&self.name, e))?;
        self.values.set("total_bytes", info.total as f64);
        self.values.set("free_bytes", info.free as f64);
        self.values.set("available_bytes", info.available as f64);
        self.values.set("used_pct", info.used_pct());
        self.values.set("swap_used_pct", info.swap_used_pct());
        Ok(())
    }

    fn get_uptime(&self) -> Duration {
        self.started_at.map(|t| t.elapsed()).unwrap_or_default()
    }
}
