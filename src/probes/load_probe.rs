use std::path::PathBuf;
use std::time::{Duration, Instant};

use super::procfs::{init_error, read_proc_file, update_error};
use super::{FieldValues, ProbeError, ProcProbeConfig, Probe};

const FIELDS: &[&str] = &["load1", "load5", "load15", "running_tasks", "total_tasks"];

#[derive(Debug, Clone, Copy, PartialEq)]
struct LoadAvg {
    load1: f64,
    load5: f64,
    load15: f64,
    running: u64,
    total: u64,
}

impl LoadAvg {
    /// Parses `/proc/loadavg`, e.g. `0.52 0.58 0.59 1/467 12345`.
    fn parse(loadavg: &str) -> Result<Self, String> {
        let parts: Vec<&str> = loadavg.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(format!("expected at least 4 columns in loadavg, got {}", parts.len()));
        }

        let load = |s: &str| s.parse::<f64>().map_err(|e| format!("bad load '{}': {}", s, e));
        let (running, total) = parts[3]
            .split_once('/')
            .ok_or_else(|| format!("bad task column '{}'", parts[3]))?;
        let tasks = |s: &str| s.parse::<u64>().map_err(|e| format!("bad task count '{}': {}", s, e));

        Ok(LoadAvg {
            load1: load(parts[0])?,
            load5: load(parts[1])?,
            load15: load(parts[2])?,
            running: tasks(running)?,
            total: tasks(total)?,
        })
    }
}

/// 1, 5 and 15 minute load averages plus scheduler task counts.
pub struct LoadProbe {
    name: String,
    proc_root: PathBuf,
    values: FieldValues,
    started_at: Option<Instant>,
}

impl LoadProbe {
    pub fn new(config: &ProcProbeConfig) -> Self {
        LoadProbe {
            name: config.name.clone().unwrap_or_else(|| "load".to_string()),
            proc_root: config.proc_root.clone(),
            values: FieldValues::new(FIELDS),
            started_at: None,
        }
    }

    fn sample(&self) -> Result<LoadAvg, String> {
        let loadavg = read_proc_file(&self.proc_root, "loadavg").map_err(|e| e.to_string())?;
        LoadAvg::parse(&loadavg)
    }
}

impl Probe for LoadProbe {
    fn init(&mut self) -> Result<(), ProbeError> {
        self.sample().map_err(|e| init_error(&self.name, e))?;
        self.started_at = Some(Instant::now());
        Ok(())
    }

    fn get_name(&self) -> &str {
        &self.name
    }

    fn get_type(&self) -> &str {
        "load"
    }

    fn get_fields(&self) -> Vec<String> {
        self.values.names()
    }

    fn get_value(&self, field: &str) -> f64 {
        self.values.get(field)
    }

    fn update_values(&self) -> Result<(), ProbeError> {
        let avg = self.sample().map_err(|e| update_error(&self.name, e))?;
        self.values.set("load1", avg.load1);
        self.values.set("load5", avg.load5);
        self.values.set("load15", avg.load15);
        self.values.set("running_tasks", avg.running as f64);
        self.values.set("total_tasks", avg.total as f64);
        Ok(())
    }

    fn get_uptime(&self) -> Duration {
        self.started_at.map(|t| t.elapsed()).unwrap_or_default()
    }
}
