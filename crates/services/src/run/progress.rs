use race_core::model::{Milestone, RunSession, milestone_at};

use crate::error::OutcomeError;
use crate::round::OutcomeHandler;

/// Aggregated view of race progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunProgress {
    /// Distance travelled; only correct answers move the ship.
    pub step: u32,
    pub max_steps: u32,
    /// One-based number of the question on screen.
    pub question_number: u32,
    pub score: u32,
    pub total_questions_asked: u32,
    pub milestone: Milestone,
    pub elapsed_ms: u64,
    pub is_complete: bool,
}

impl RunProgress {
    /// Share of the journey covered, 0..=100.
    #[must_use]
    pub fn percent(&self) -> u32 {
        if self.max_steps == 0 {
            return 100;
        }
        self.step.min(self.max_steps) * 100 / self.max_steps
    }
}

/// Counts results into the run as rounds advance.
pub(crate) struct RunTally {
    session: RunSession,
    step: u32,
    max_steps: u32,
}

impl RunTally {
    pub(crate) fn new(session: RunSession, max_steps: u32) -> Self {
        Self {
            session,
            step: 0,
            max_steps,
        }
    }

    pub(crate) fn session(&self) -> &RunSession {
        &self.session
    }

    pub(crate) fn session_mut(&mut self) -> &mut RunSession {
        &mut self.session
    }

    pub(crate) fn into_session(self) -> RunSession {
        self.session
    }

    pub(crate) fn step(&self) -> u32 {
        self.step
    }

    pub(crate) fn max_steps(&self) -> u32 {
        self.max_steps
    }

    pub(crate) fn reached_goal(&self) -> bool {
        self.step >= self.max_steps
    }

    pub(crate) fn milestone(&self) -> Milestone {
        milestone_at(self.step)
    }
}

impl OutcomeHandler for RunTally {
    fn on_correct(&mut self) -> Result<(), OutcomeError> {
        self.session.record_correct()?;
        self.step = (self.step + 1).min(self.max_steps);
        Ok(())
    }

    fn on_wrong(&mut self) -> Result<(), OutcomeError> {
        self.session.record_wrong()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use race_core::model::{AvatarConfig, PlayerName};
    use race_core::time::fixed_now;

    fn tally(max_steps: u32) -> RunTally {
        let session = RunSession::start(
            PlayerName::new("Nova").unwrap(),
            AvatarConfig::default(),
            fixed_now(),
        );
        RunTally::new(session, max_steps)
    }

    #[test]
    fn wrong_answers_count_but_do_not_move() {
        let mut tally = tally(3);
        tally.on_wrong().unwrap();
        tally.on_correct().unwrap();
        tally.on_wrong().unwrap();

        assert_eq!(tally.step(), 1);
        assert_eq!(tally.session().score(), 1);
        assert_eq!(tally.session().total_questions_asked(), 3);
        assert!(!tally.reached_goal());
    }

    #[test]
    fn step_never_passes_the_goal() {
        let mut tally = tally(2);
        for _ in 0..2 {
            tally.on_correct().unwrap();
        }
        assert!(tally.reached_goal());
        assert_eq!(tally.step(), 2);
    }

    #[test]
    fn finished_session_rejects_results() {
        let mut tally = tally(5);
        tally.session_mut().finish(fixed_now()).unwrap();
        assert!(matches!(tally.on_correct(), Err(OutcomeError::Run(_))));
    }

    #[test]
    fn percent_tracks_the_journey() {
        let progress = RunProgress {
            step: 10,
            max_steps: 23,
            question_number: 12,
            score: 10,
            total_questions_asked: 11,
            milestone: milestone_at(10),
            elapsed_ms: 0,
            is_complete: false,
        };
        assert_eq!(progress.percent(), 43);
        assert_eq!(progress.milestone.label, "Asteroid Belt");
    }
}
