//! In-memory probe for exercising registration, polling and export.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::{FieldValues, Probe, ProbeError};

/// A probe whose next update is scripted by the caller.
///
/// A successful update publishes staged values. With nothing staged, every
/// field is set to the number of updates run so far.
pub struct TestProbe {
    name: String,
    values: FieldValues,
    staged: Mutex<Vec<(String, f64)>>,
    failing: AtomicBool,
    fail_init: bool,
    updates: AtomicU64,
    started_at: Option<Instant>,
}

impl TestProbe {
    pub fn new(name: &str, fields: &[&str]) -> Self {
        TestProbe {
            name: name.to_string(),
            values: FieldValues::new(fields),
            staged: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            fail_init: false,
            updates: AtomicU64::new(0),
            started_at: None,
        }
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    /// Value published by the next successful update.
    pub fn stage(&self, field: &str, value: f64) {
        self.staged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((field.to_string(), value));
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::SeqCst)
    }
}

impl Probe for TestProbe {
    fn init(&mut self) -> Result<(), ProbeError> {
        if self.fail_init {
            return Err(ProbeError::Init {
                probe: self.name.clone(),
                reason: "scripted init failure".to_string(),
            });
        }
        self.started_at = Some(Instant::now());
        Ok(())
    }

    fn get_name(&self) -> &str {
        &self.name
    }

    fn get_type(&self) -> &str {
        "test"
    }

    fn get_fields(&self) -> Vec<String> {
        self.values.names()
    }

    fn get_value(&self, field: &str) -> f64 {
        self.values.get(field)
    }

    fn update_values(&self) -> Result<(), ProbeError> {
        let n = self.updates.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing.load(Ordering::SeqCst) {
            return Err(ProbeError::Update {
                probe: self.name.clone(),
                reason: "scripted update failure".to_string(),
            });
        }

        let staged: Vec<(String, f64)> = self
            .staged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        if staged.is_empty() {
            for field in self.values.names() {
                self.values.set(&field, n as f64);
            }
        }
        for (field, value) in staged {
            self.values.set(&field, value);
        }
        Ok(())
    }

    fn get_uptime(&self) -> Duration {
        self.started_at.map(|t| t.elapsed()).unwrap_or_default()
    }
}
