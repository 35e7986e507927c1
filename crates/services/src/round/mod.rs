mod controller;
mod latch;
mod timers;

// Public API of the quiz round subsystem.
pub use crate::error::OutcomeError;
pub use controller::{
    AdvanceIgnored, AdvanceOutcome, AdvanceTrigger, ArmTimer, IgnoredSelection, LockedAnswer,
    OutcomeHandler, PresentedRound, RoundController, RoundId, RoundPhase, RoundView, Selection,
    TimerKind, TimerTicket,
};
pub use latch::AdvanceLatch;
pub use timers::FeedbackTimers;
