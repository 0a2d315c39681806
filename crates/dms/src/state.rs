//! Eye-closure run tracking

/// Debounced fatigue signal state for the current closed-eye run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FatigueSignal {
    /// Start of the current continuous closed run (milliseconds)
    pub since: Option<u64>,

    /// Whether `FatigueStarted` was already emitted for this run
    pub emitted: bool,
}

impl FatigueSignal {
    /// Eyes are currently in a closed run
    pub fn is_closed(&self) -> bool {
        self.since.is_some()
    }

    /// Fatigue has been confirmed for the current run
    pub fn is_active(&self) -> bool {
        self.emitted
    }

    /// Reset state (eyes open, face lost, driver change)
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
