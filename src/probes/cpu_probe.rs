use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use super::procfs::{init_error, read_proc_file, update_error};
use super::{FieldValues, ProbeError, ProcProbeConfig, Probe};

const FIELDS: &[&str] = &["user_pct", "system_pct", "idle_pct", "iowait_pct", "usage_pct"];

/// Aggregate jiffy counters from the first `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct CpuTimes {
    user: u64,
    nice: u64,
    system: u64,
    idle: u64,
    iowait: u64,
    irq: u64,
    softirq: u64,
    steal: u64,
}

impl CpuTimes {
    fn parse(stat: &str) -> Result<Self, String> {
        let line = stat
            .lines()
            .find(|l| l.split_whitespace().next() == Some("cpu"))
            .ok_or("no aggregate 'cpu' line in stat")?;

        let counters = line
            .split_whitespace()
            .skip(1)
            .map(|v| v.parse::<u64>().map_err(|e| format!("bad cpu counter '{}': {}", v, e)))
            .collect::<Result<Vec<u64>, String>>()?;
        if counters.len() < 4 {
            return Err(format!("expected at least 4 cpu counters, got {}", counters.len()));
        }

        let at = |i: usize| counters.get(i).copied().unwrap_or(0);
        let times = CpuTimes {
            user: at(0),
            nice: at(1),
            system: at(2),
            idle: at(3),
            iowait: at(4),
            irq: at(5),
            softirq: at(6),
            steal: at(7),
        };
        times.total()?;
        Ok(times)
    }

    fn total(&self) -> Result<u64, String> {
        checked_sum(&[
            self.user,
            self.nice,
            self.system,
            self.idle,
            self.iowait,
            self.irq,
            self.softirq,
            self.steal,
        ])
    }

    /// Counter deltas since `earlier`. Saturates if counters went backwards.
    fn since(&self, earlier: &CpuTimes) -> CpuTimes {
        CpuTimes {
            user: self.user.saturating_sub(earlier.user),
            nice: self.nice.saturating_sub(earlier.nice),
            system: self.system.saturating_sub(earlier.system),
            idle: self.idle.saturating_sub(earlier.idle),
            iowait: self.iowait.saturating_sub(earlier.iowait),
            irq: self.irq.saturating_sub(earlier.irq),
            softirq: self.softirq.saturating_sub(earlier.softirq),
            steal: self.steal.saturating_sub(earlier.steal),
        }
    }
}

fn checked_sum(jiffies: &[u64]) -> Result<u64, String> {
    jiffies
        .iter()
        .try_fold(0u64, |acc, &v| acc.checked_add(v))
        .ok_or_else(|| "cpu counters overflow".to_string())
}

/// CPU utilisation over the last poll interval, in percent.
pub struct CpuProbe {
    name: String,
    proc_root: PathBuf,
    values: FieldValues,
    previous: Mutex<Option<CpuTimes>>,
    started_at: Option<Instant>,
}

impl CpuProbe {
    pub fn new(config: &ProcProbeConfig) -> Self {
        CpuProbe {
            name: config.name.clone().unwrap_or_else(|| "cpu".to_string()),
            proc_root: config.proc_root.clone(),
            values: FieldValues::new(FIELDS),
            previous: Mutex::new(None),
            started_at: None,
        }
    }

    fn sample(&self) -> Result<CpuTimes, String> {
        let stat = read_proc_file(&self.proc_root, "stat").map_err(|e| e.to_string())?;
        CpuTimes::parse(&stat)
    }
}

impl Probe for CpuProbe {
    fn init(&mut self) -> Result<(), ProbeError> {
        let baseline = self.sample().map_err(|e| init_error(&self.name, e))?;
        *self
            .previous
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner) = Some(baseline);
        self.started_at = Some(Instant::now());
        Ok(())
    }

    fn get_name(&self) -> &str {
        &self.name
    }

    fn get_type(&self) -> &str {
        "cpu"
    }

    fn get_fields(&self) -> Vec<String> {
        self.values.names()
    }

    fn get_value(&self, field: &str) -> f64 {
        self.values.get(field)
    }

    fn update_values(&self) -> Result<(), ProbeError> {
        let current = self.sample().map_err(|e| update_error(&self.name, e))?;
        let mut previous = self.previous.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(earlier) = previous.as_ref() {
            let delta = current.since(earlier);
            let total = delta.total().map_err(|e| update_error(&self.name, e))?;
            if total == 0 {
                debug!("No cpu time elapsed for '{}', keeping last values", self.name);
            } else {
                let user = checked_sum(&[delta.user, delta.nice]);
                let system = checked_sum(&[delta.system, delta.irq, delta.softirq]);
                let (user, system) = user
                    .and_then(|u| system.map(|s| (u, s)))
                    .map_err(|e| update_error(&self.name, e))?;

                let pct = |jiffies: u64| jiffies as f64 * 100.0 / total as f64;
                let idle = pct(delta.idle);
                let iowait = pct(delta.iowait);
                self.values.set("user_pct", pct(user));
                self.values.set("system_pct", pct(system));
                self.values.set("idle_pct", idle);
                self.values.set("iowait_pct", iowait);
                self.values.set("usage_pct", 100.0 - idle - iowait);
            }
        }

        *previous = Some(current);
        Ok(())
    }

    fn get_uptime(&self) -> Duration {
        self.started_at.map(|t| t.elapsed()).unwrap_or_default()
    }
}
