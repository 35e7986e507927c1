/// One-shot guard that lets exactly one advance through per round.
///
/// Timers and manual input all funnel into the controller on one task, so a
/// plain flag is enough; whoever fires first wins and every later call is a
/// no-op until the next question arms the latch again.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AdvanceLatch {
    fired: bool,
}

impl AdvanceLatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` for the first call after a reset, `false` afterwards.
    pub fn try_fire(&mut self) -> bool {
        if self.fired {
            return false;
        }
        self.fired = true;
        true
    }

    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.fired
    }

    pub fn reset(&mut self) {
        self.fired = false;
    }
}
