use std::sync::atomic::{AtomicU64, Ordering};

/// Page views since process start.
#[derive(Debug, Default)]
pub struct VisitCounter {
    count: AtomicU64,
}

impl VisitCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one visit and returns the new total.
    pub fn increment(&self) -> u64 {
        self.count.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn current(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}
