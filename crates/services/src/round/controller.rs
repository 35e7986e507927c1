use std::fmt;
use std::mem;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{debug, error};

use race_core::model::{GameSettings, Question, QuestionId};

use super::latch::AdvanceLatch;
use crate::error::OutcomeError;

//
// ─── ROUND IDENTITY ────────────────────────────────────────────────────────────
//

/// Monotonic id of one presentation of a question.
///
/// Every `present_question` (and every recovery after a failed advance) opens a
/// new round, so anything scheduled against an older round can be recognised
/// and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
#[serde(transparent)]
pub struct RoundId(u64);

impl RoundId {
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Short delay after the feedback is shown.
    Primary,
    /// Safety net in case the primary delay never fires.
    Fallback,
}

/// Identifies one armed feedback timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerTicket {
    pub round: RoundId,
    pub kind: TimerKind,
}

/// A timer the host should arm after an answer locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmTimer {
    pub ticket: TimerTicket,
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceTrigger {
    Timer(TimerTicket),
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    /// Nothing presented yet.
    Idle,
    Presenting,
    Locked,
    Advancing,
    /// The run is over; input is refused.
    Closed,
}

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// Receives the result of a round exactly once per successful advance.
pub trait OutcomeHandler {
    /// # Errors
    ///
    /// Returning an error reopens the question instead of advancing.
    fn on_correct(&mut self) -> Result<(), OutcomeError>;

    /// # Errors
    ///
    /// Returning an error reopens the question instead of advancing.
    fn on_wrong(&mut self) -> Result<(), OutcomeError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedRound {
    pub round: RoundId,
    pub question_id: QuestionId,
    pub prompt: String,
    pub options: Vec<String>,
    /// Timers of the previous round that must no longer fire.
    pub cancelled: Vec<TimerTicket>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedAnswer {
    pub round: RoundId,
    pub selected: String,
    pub correct: bool,
    pub timers: [ArmTimer; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredSelection {
    NotAnswerable(RoundPhase),
    UnknownOption,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Locked(LockedAnswer),
    Ignored(IgnoredSelection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceIgnored {
    /// Timer from an earlier round or one already cancelled.
    Stale,
    /// No answer is locked in.
    NotLocked,
    /// Another trigger won the race for this round.
    AlreadyAdvanced,
}

#[derive(Debug)]
pub enum AdvanceOutcome {
    Advanced {
        round: RoundId,
        correct: bool,
        cancelled: Vec<TimerTicket>,
    },
    /// The handler failed; the same question is answerable again under `round`.
    Recovered {
        failed_round: RoundId,
        round: RoundId,
        error: OutcomeError,
        cancelled: Vec<TimerTicket>,
    },
    Ignored(AdvanceIgnored),
}

impl AdvanceOutcome {
    #[must_use]
    pub fn is_advanced(&self) -> bool {
        matches!(self, Self::Advanced { .. })
    }
}

/// Snapshot of the current round for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundView {
    pub round: RoundId,
    pub phase: RoundPhase,
    pub prompt: String,
    pub options: Vec<String>,
    pub selected: Option<String>,
    pub correct: Option<bool>,
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Presents one question at a time, locks the first answer, and advances once.
///
/// The controller never sleeps. Locking an answer hands back the two feedback
/// timers to arm; whichever of those timers or a manual "next" reaches
/// [`RoundController::advance`] first invokes the outcome handler, and every
/// other trigger for that round is ignored.
pub struct RoundController {
    rng: StdRng,
    primary_delay: Duration,
    fallback_delay: Duration,
    round: RoundId,
    question: Option<Question>,
    options: Vec<String>,
    phase: RoundPhase,
    selected: Option<String>,
    correct: Option<bool>,
    armed: Vec<TimerTicket>,
    latch: AdvanceLatch,
}

impl RoundController {
    #[must_use]
    pub fn new(settings: &GameSettings) -> Self {
        Self::with_rng(settings, StdRng::from_rng(&mut rand::rng()))
    }

    /// Deterministic option order, for tests and replays.
    #[must_use]
    pub fn with_seed(settings: &GameSettings, seed: u64) -> Self {
        Self::with_rng(settings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(settings: &GameSettings, rng: StdRng) -> Self {
        Self {
            rng,
            primary_delay: settings.primary_feedback(),
            fallback_delay: settings.fallback_feedback(),
            round: RoundId::default(),
            question: None,
            options: Vec::new(),
            phase: RoundPhase::Idle,
            selected: None,
            correct: None,
            armed: Vec::new(),
            latch: AdvanceLatch::new(),
        }
    }

    #[must_use]
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    #[must_use]
    pub fn round(&self) -> RoundId {
        self.round
    }

    #[must_use]
    pub fn question(&self) -> Option<&Question> {
        self.question.as_ref()
    }

    /// Options in display order for the current round.
    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    #[must_use]
    pub fn correct(&self) -> Option<bool> {
        self.correct
    }

    #[must_use]
    pub fn armed_timers(&self) -> &[TimerTicket] {
        &self.armed
    }

    #[must_use]
    pub fn is_answerable(&self) -> bool {
        self.phase == RoundPhase::Presenting
    }

    #[must_use]
    pub fn view(&self) -> Option<RoundView> {
        let question = self.question.as_ref()?;
        Some(RoundView {
            round: self.round,
            phase: self.phase,
            prompt: question.prompt().to_owned(),
            options: self.options.clone(),
            selected: self.selected.clone(),
            correct: self.correct,
        })
    }

    /// Show a new question with freshly shuffled options.
    ///
    /// Clears the previous selection, cancels its pending timers, and re-arms
    /// the advance latch.
    pub fn present_question(&mut self, question: Question) -> PresentedRound {
        let mut options = question.options().to_vec();
        options.shuffle(&mut self.rng);

        let cancelled = mem::take(&mut self.armed);
        let question_id = question.id();
        let prompt = question.prompt().to_owned();
        self.question = Some(question);
        self.options = options;
        let round = self.reopen();
        debug!(%round, question = %question_id, "presenting question");

        PresentedRound {
            round,
            question_id,
            prompt,
            options: self.options.clone(),
            cancelled,
        }
    }

    /// Lock in an answer.
    ///
    /// Only the first selection of a round counts; later ones, and clicks on
    /// options the question does not have, are ignored.
    pub fn select_answer(&mut self, option: &str) -> Selection {
        if self.phase != RoundPhase::Presenting {
            debug!(round = %self.round, phase = ?self.phase, "ignoring selection");
            return Selection::Ignored(IgnoredSelection::NotAnswerable(self.phase));
        }
        let Some(question) = self.question.as_ref() else {
            return Selection::Ignored(IgnoredSelection::NotAnswerable(self.phase));
        };
        if !question.has_option(option) {
            return Selection::Ignored(IgnoredSelection::UnknownOption);
        }

        let correct = question.is_correct(option);
        self.phase = RoundPhase::Locked;
        self.selected = Some(option.to_owned());
        self.correct = Some(correct);

        let timers = [
            ArmTimer {
                ticket: TimerTicket {
                    round: self.round,
                    kind: TimerKind::Primary,
                },
                delay: self.primary_delay,
            },
            ArmTimer {
                ticket: TimerTicket {
                    round: self.round,
                    kind: TimerKind::Fallback,
                },
                delay: self.fallback_delay,
            },
        ];
        self.armed = timers.iter().map(|t| t.ticket).collect();
        debug!(round = %self.round, correct, "answer locked");

        Selection::Locked(LockedAnswer {
            round: self.round,
            selected: option.to_owned(),
            correct,
            timers,
        })
    }

    /// Deliver a fired feedback timer.
    pub fn timer_fired(
        &mut self,
        ticket: TimerTicket,
        handler: Option<&mut dyn OutcomeHandler>,
    ) -> AdvanceOutcome {
        self.advance(AdvanceTrigger::Timer(ticket), handler)
    }

    /// Move past the locked answer, at most once per round.
    ///
    /// The winning trigger cancels the other timers and reports the captured
    /// correctness to `handler`. A missing or failing handler is logged and
    /// the question is reopened under a new round so the player is never
    /// stuck.
    pub fn advance(
        &mut self,
        trigger: AdvanceTrigger,
        handler: Option<&mut dyn OutcomeHandler>,
    ) -> AdvanceOutcome {
        if let AdvanceTrigger::Timer(ticket) = trigger {
            if ticket.round != self.round || !self.armed.contains(&ticket) {
                debug!(?ticket, current = %self.round, "ignoring stale timer");
                return AdvanceOutcome::Ignored(AdvanceIgnored::Stale);
            }
        }

        match self.phase {
            RoundPhase::Locked => {}
            RoundPhase::Advancing => return AdvanceOutcome::Ignored(AdvanceIgnored::AlreadyAdvanced),
            _ => return AdvanceOutcome::Ignored(AdvanceIgnored::NotLocked),
        }
        if !self.latch.try_fire() {
            return AdvanceOutcome::Ignored(AdvanceIgnored::AlreadyAdvanced);
        }

        self.phase = RoundPhase::Advancing;
        let cancelled = mem::take(&mut self.armed);
        let correct = self.correct.unwrap_or(false);
        let round = self.round;

        let result = match handler {
            None => Err(OutcomeError::MissingHandler),
            Some(handler) if correct => handler.on_correct(),
            Some(handler) => handler.on_wrong(),
        };

        match result {
            Ok(()) => {
                debug!(%round, correct, ?trigger, "round advanced");
                AdvanceOutcome::Advanced {
                    round,
                    correct,
                    cancelled,
                }
            }
            Err(error) => {
                error!(%round, %error, "advance failed, reopening question");
                let reopened = self.reopen();
                AdvanceOutcome::Recovered {
                    failed_round: round,
                    round: reopened,
                    error,
                    cancelled,
                }
            }
        }
    }

    /// Stop accepting input. Returns timers that must be cancelled.
    pub fn close(&mut self) -> Vec<TimerTicket> {
        self.phase = RoundPhase::Closed;
        mem::take(&mut self.armed)
    }

    // New round for the question already in place.
    fn reopen(&mut self) -> RoundId {
        self.round = RoundId(self.round.0 + 1);
        self.phase = RoundPhase::Presenting;
        self.selected = None;
        self.correct = None;
        self.armed.clear();
        self.latch.reset();
        self.round
    }
}
