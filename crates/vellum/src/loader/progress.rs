//! Byte counters to percentage.

use serde::{Deserialize, Serialize};

/// Raw progress as reported by an engine.
///
/// `total == 0` means the engine does not know the document length (for
/// example a server that sends no `Content-Length`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressData {
    pub loaded: u64,
    pub total: u64,
}

impl ProgressData {
    pub fn new(loaded: u64, total: u64) -> Self {
        Self { loaded, total }
    }

    pub fn percentage(&self) -> f64 {
        percentage(self.loaded, self.total)
    }
}

/// Normalise byte counters to `[0, 100]`.
///
/// `loaded` can exceed `total` (compressed transfers), hence the clamp. An
/// unknown total counts as fully buffered.
pub fn percentage(loaded: u64, total: u64) -> f64 {
    if total > 0 {
        (100.0 * loaded as f64 / total as f64).min(100.0)
    } else {
        100.0
    }
}

/// Remembers the percentage of the last counters it was given.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgressTracker {
    percentages: f64,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record new counters and return the resulting percentage.
    pub fn update(&mut self, progress: ProgressData) -> f64 {
        self.percentages = progress.percentage();
        self.percentages
    }

    pub fn percentages(&self) -> f64 {
        self.percentages
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
