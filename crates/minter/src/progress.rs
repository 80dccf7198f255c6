//! Per-run mint accounting.

/// Counts completed mints toward a target, distinguishing fee-bump
/// replacements from genuine new mints. Created at loop start and
/// discarded at loop exit; nothing is persisted.
#[derive(Debug)]
pub struct MintProgress {
    completed: u64,
    target: u64,
    pending_speedup: bool,
}

impl MintProgress {
    pub fn new(target: u64) -> Self {
        Self {
            completed: 0,
            target,
            pending_speedup: false,
        }
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn target(&self) -> u64 {
        self.target
    }

    pub fn is_complete(&self) -> bool {
        self.completed >= self.target
    }

    /// Marks the next broadcast as a fee-bump replacement rather than a
    /// new mint.
    pub fn flag_speedup(&mut self) {
        self.pending_speedup = true;
    }

    /// Clears a pending speedup whose broadcast never landed.
    pub fn clear_speedup(&mut self) {
        self.pending_speedup = false;
    }

    /// Records a successful broadcast. A pending speedup only clears the
    /// flag; anything else counts toward the target. Returns whether the
    /// broadcast was counted.
    pub fn record_broadcast(&mut self) -> bool {
        if self.pending_speedup {
            self.pending_speedup = false;
            false
        } else {
            self.completed += 1;
            true
        }
    }
}
