use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Completion counter shared between pool workers.
///
/// Increments are atomic, so workers finishing out of order never lose counts.
#[derive(Clone, Debug)]
pub struct ProgressCounter {
    label: &'static str,
    completed: Arc<AtomicUsize>,
    total: usize,
}

impl ProgressCounter {
    pub fn new(label: &'static str, total: usize) -> Self {
        Self {
            label,
            completed: Arc::new(AtomicUsize::new(0)),
            total,
        }
    }

    /// Records one completion and returns the new count.
    pub fn increment(&self) -> usize {
        let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        log::info!("{} progress: {done}/{}", self.label, self.total);
        done
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}
