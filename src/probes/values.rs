use std::sync::atomic::{AtomicU64, Ordering};

/// Fixed set of named `f64` slots, readable while another thread writes.
///
/// Values are stored as their bit patterns in atomics so readers never block
/// and never see a torn value. Slots start at zero.
#[derive(Debug)]
pub struct FieldValues {
    names: Vec<String>,
    slots: Vec<AtomicU64>,
}

impl FieldValues {
    pub fn new(names: &[&str]) -> Self {
        FieldValues {
            names: names.iter().map(|n| n.to_string()).collect(),
            slots: names.iter().map(|_| AtomicU64::new(0f64.to_bits())).collect(),
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.names.clone()
    }

    pub fn get(&self, field: &str) -> f64 {
        match self.index_of(field) {
            Some(i) => f64::from_bits(self.slots[i].load(Ordering::Relaxed)),
            None => f64::NAN,
        }
    }

    /// Stores `value` for `field`. Unknown fields are ignored.
    pub fn set(&self, field: &str, value: f64) {
        if let Some(i) = self.index_of(field) {
            self.slots[i].store(value.to_bits(), Ordering::Relaxed);
        }
    }

    fn index_of(&self, field: &str) -> Option<usize> {
        self.names.iter().position(|n| n == field)
    }
}
