use std::mem;
use std::sync::Arc;

use tracing::{error, info, warn};

use race_core::bank::QuestionBank;
use race_core::model::{GameSettings, Question, RunSession};
use race_core::rank::compute_rank;
use storage::leaderboard::LeaderboardStore;

use super::progress::{RunProgress, RunTally};
use super::report::{FinalStats, RunReport};
use crate::Clock;
use crate::error::RunError;
use crate::events::GameEvent;
use crate::round::{
    AdvanceIgnored, AdvanceOutcome, AdvanceTrigger, PresentedRound, RoundController, RoundId,
    RoundView, Selection, TimerTicket,
};
use crate::sequencer::QuestionSequencer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Racing,
    Finished,
    Abandoned,
}

/// What an advance attempt did to the race.
#[derive(Debug)]
pub enum RoundStep {
    /// The next question is on screen.
    NextQuestion(PresentedRound),
    /// The goal was reached; the run is sealed and submitted. Every timer
    /// still armed for the last round is in `cancelled`.
    Finished {
        report: Box<RunReport>,
        cancelled: Vec<TimerTicket>,
    },
    /// The advance failed and the same question is answerable again.
    Reopened {
        round: RoundId,
        cancelled: Vec<TimerTicket>,
    },
    Ignored(AdvanceIgnored),
}

/// Drives one race: deals questions, counts results, and seals the run.
///
/// Correct answers move the ship one step; wrong ones only count as asked.
/// Reaching the goal stops the clock, submits the run to the leaderboard, and
/// builds the results report. A failed leaderboard write is logged and kept
/// on the report; the run is never lost because of it.
pub struct RunOrchestrator {
    clock: Clock,
    controller: RoundController,
    sequencer: QuestionSequencer,
    tally: RunTally,
    leaderboard: Arc<LeaderboardStore>,
    status: RunStatus,
    report: Option<RunReport>,
    events: Vec<GameEvent>,
}

impl RunOrchestrator {
    /// Start a race and put the first question on screen.
    #[must_use]
    pub fn start(
        session: RunSession,
        bank: &QuestionBank,
        leaderboard: Arc<LeaderboardStore>,
        settings: &GameSettings,
        clock: Clock,
    ) -> Self {
        Self::assemble(
            session,
            RoundController::new(settings),
            QuestionSequencer::new(bank),
            leaderboard,
            settings,
            clock,
        )
    }

    /// Like [`RunOrchestrator::start`] with deterministic question and option order.
    #[must_use]
    pub fn start_seeded(
        session: RunSession,
        bank: &QuestionBank,
        leaderboard: Arc<LeaderboardStore>,
        settings: &GameSettings,
        clock: Clock,
        seed: u64,
    ) -> Self {
        Self::assemble(
            session,
            RoundController::with_seed(settings, seed),
            QuestionSequencer::with_seed(bank, seed),
            leaderboard,
            settings,
            clock,
        )
    }

    fn assemble(
        session: RunSession,
        controller: RoundController,
        sequencer: QuestionSequencer,
        leaderboard: Arc<LeaderboardStore>,
        settings: &GameSettings,
        clock: Clock,
    ) -> Self {
        info!(
            run_id = %session.run_id(),
            player = %session.player_name(),
            "race started"
        );
        let mut run = Self {
            clock,
            controller,
            sequencer,
            tally: RunTally::new(session, settings.max_steps()),
            leaderboard,
            status: RunStatus::Racing,
            report: None,
            events: Vec::new(),
        };
        run.present_current();
        run
    }

    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.status
    }

    #[must_use]
    pub fn is_racing(&self) -> bool {
        self.status == RunStatus::Racing
    }

    #[must_use]
    pub fn session(&self) -> &RunSession {
        self.tally.session()
    }

    #[must_use]
    pub fn into_session(self) -> RunSession {
        self.tally.into_session()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.controller.question()
    }

    #[must_use]
    pub fn view(&self) -> Option<RoundView> {
        self.controller.view()
    }

    #[must_use]
    pub fn armed_timers(&self) -> &[TimerTicket] {
        self.controller.armed_timers()
    }

    #[must_use]
    pub fn report(&self) -> Option<&RunReport> {
        self.report.as_ref()
    }

    /// The clock the race is timed with. Manual clocks can be stepped here.
    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    #[must_use]
    pub fn progress(&self) -> RunProgress {
        let session = self.tally.session();
        RunProgress {
            step: self.tally.step(),
            max_steps: self.tally.max_steps(),
            question_number: self.question_number(),
            score: session.score(),
            total_questions_asked: session.total_questions_asked(),
            milestone: self.tally.milestone(),
            elapsed_ms: session.elapsed_ms(self.clock.now()),
            is_complete: self.status == RunStatus::Finished,
        }
    }

    /// Drain events emitted since the last call.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        mem::take(&mut self.events)
    }

    /// Lock in an answer for the question on screen.
    pub fn select_answer(&mut self, option: &str) -> Selection {
        let selection = self.controller.select_answer(option);
        if let Selection::Locked(locked) = &selection {
            self.events.push(GameEvent::AnswerLocked {
                round: locked.round,
                selected: locked.selected.clone(),
                correct: locked.correct,
            });
        }
        selection
    }

    /// Deliver a fired feedback timer.
    ///
    /// # Errors
    ///
    /// See [`RunOrchestrator::advance`].
    pub async fn timer_fired(&mut self, ticket: TimerTicket) -> Result<RoundStep, RunError> {
        self.advance(AdvanceTrigger::Timer(ticket)).await
    }

    /// Move on from the locked answer.
    ///
    /// Only the first trigger per round counts. Reaching the goal finishes
    /// the race and submits it.
    ///
    /// # Errors
    ///
    /// Returns `RunError::Session` if the run cannot be sealed.
    pub async fn advance(&mut self, trigger: AdvanceTrigger) -> Result<RoundStep, RunError> {
        match self.controller.advance(trigger, Some(&mut self.tally)) {
            AdvanceOutcome::Ignored(reason) => Ok(RoundStep::Ignored(reason)),
            AdvanceOutcome::Recovered {
                round, cancelled, ..
            } => {
                self.events.push(GameEvent::RoundReopened { round });
                Ok(RoundStep::Reopened { round, cancelled })
            }
            AdvanceOutcome::Advanced {
                round,
                correct,
                cancelled,
            } => {
                self.events.push(GameEvent::RoundAdvanced {
                    round,
                    correct,
                    step: self.tally.step(),
                    total_questions_asked: self.tally.session().total_questions_asked(),
                });

                if self.tally.reached_goal() {
                    let mut cancelled = cancelled;
                    cancelled.extend(self.controller.close());
                    let report = self.finish().await?;
                    return Ok(RoundStep::Finished {
                        report: Box::new(report),
                        cancelled,
                    });
                }

                self.sequencer.advance();
                match self.present_current() {
                    Some(mut presented) => {
                        presented.cancelled.extend(cancelled);
                        Ok(RoundStep::NextQuestion(presented))
                    }
                    None => Ok(RoundStep::Ignored(AdvanceIgnored::NotLocked)),
                }
            }
        }
    }

    /// Resubmit a finished run whose leaderboard write failed.
    ///
    /// Submitting is idempotent per run, so calling this after a successful
    /// write only refreshes the report.
    ///
    /// # Errors
    ///
    /// Returns `RunError::NotFinished` while racing, `RunError::Abandoned`
    /// for an abandoned run.
    pub async fn retry_submission(&mut self) -> Result<RunReport, RunError> {
        match self.status {
            RunStatus::Racing => Err(RunError::NotFinished),
            RunStatus::Abandoned => Err(RunError::Abandoned),
            RunStatus::Finished => self.submit().await,
        }
    }

    /// End the race early. Nothing is submitted.
    ///
    /// Returns timers that must no longer fire.
    pub fn abandon(&mut self) -> Vec<TimerTicket> {
        if self.status != RunStatus::Racing {
            return Vec::new();
        }
        self.status = RunStatus::Abandoned;
        let run_id = self.tally.session().run_id().clone();
        info!(%run_id, "race abandoned");
        self.events.push(GameEvent::RunAbandoned { run_id });
        self.controller.close()
    }

    /// Number of the question on screen; after finishing, the last one asked.
    fn question_number(&self) -> u32 {
        let asked = self.tally.session().total_questions_asked();
        if self.status == RunStatus::Finished {
            asked
        } else {
            asked + 1
        }
    }

    fn present_current(&mut self) -> Option<PresentedRound> {
        let Some(question) = self.sequencer.current().cloned() else {
            error!("question bank is empty, nothing to present");
            return None;
        };
        let presented = self.controller.present_question(question);
        self.events.push(GameEvent::QuestionChanged {
            round: presented.round,
            question_number: self.question_number(),
            prompt: presented.prompt.clone(),
            options: presented.options.clone(),
        });
        Some(presented)
    }

    async fn finish(&mut self) -> Result<RunReport, RunError> {
        let time_ms = self.tally.session_mut().finish(self.clock.now())?;
        self.status = RunStatus::Finished;

        let session = self.tally.session();
        info!(
            run_id = %session.run_id(),
            time_ms,
            score = session.score(),
            asked = session.total_questions_asked(),
            "race finished"
        );
        let stats = self.final_stats(time_ms);
        self.events.push(GameEvent::RunCompleted { stats });
        self.submit().await
    }

    async fn submit(&mut self) -> Result<RunReport, RunError> {
        let entry = self.tally.session().to_entry()?;
        let stats = self.final_stats(entry.time_ms);

        let receipt = self.leaderboard.submit(entry).await;
        let persist_error = receipt.persist_error.map(|err| {
            warn!(run_id = %stats.run_id, error = %err, "leaderboard write failed, keeping local result");
            err.to_string()
        });

        let snapshot = self.leaderboard.get_ranked(usize::MAX).await;
        let rank = compute_rank(stats.time_ms, &snapshot);
        self.events.push(GameEvent::LeaderboardUpdated {
            entries: receipt.ranked.clone(),
        });

        let report = RunReport {
            stats,
            rank,
            leaderboard: receipt.ranked,
            persist_error,
        };
        self.report = Some(report.clone());
        Ok(report)
    }

    fn final_stats(&self, time_ms: u64) -> FinalStats {
        let session = self.tally.session();
        FinalStats::new(
            session.run_id().clone(),
            session.player_name().as_str(),
            time_ms,
            session.score(),
            session.total_questions_asked(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use race_core::model::{AvatarConfig, PlayerName};
    use race_core::time::fixed_clock;
    use storage::repository::InMemoryKeyValueStore;

    async fn race(max_steps: u32) -> RunOrchestrator {
        let settings = GameSettings::default().with_max_steps(max_steps).unwrap();
        let clock = fixed_clock();
        let session = RunSession::start(
            PlayerName::new("Nova").unwrap(),
            AvatarConfig::default(),
            clock.now(),
        );
        let board = LeaderboardStore::open(Arc::new(InMemoryKeyValueStore::new()), &settings).await;
        RunOrchestrator::start_seeded(
            session,
            &QuestionBank::builtin().unwrap(),
            Arc::new(board),
            &settings,
            clock,
            42,
        )
    }

    fn answer(run: &mut RunOrchestrator, correct: bool) {
        let question = run.current_question().unwrap().clone();
        let option = if correct {
            question.correct_answer().to_owned()
        } else {
            question
                .options()
                .iter()
                .find(|o| !question.is_correct(o))
                .unwrap()
                .clone()
        };
        assert!(matches!(run.select_answer(&option), Selection::Locked(_)));
    }

    #[tokio::test]
    async fn first_question_is_on_screen_at_start() {
        let mut run = race(3).await;
        let events = run.take_events();
        assert!(matches!(
            events.as_slice(),
            [GameEvent::QuestionChanged {
                question_number: 1,
                ..
            }]
        ));
        assert_eq!(run.progress().step, 0);
        assert!(run.is_racing());
    }

    #[tokio::test]
    async fn wrong_answers_repeat_the_step_with_a_new_question() {
        let mut run = race(3).await;
        let first = run.current_question().unwrap().id();
        answer(&mut run, false);
        let step = run.advance(AdvanceTrigger::Manual).await.unwrap();

        assert!(matches!(step, RoundStep::NextQuestion(_)));
        assert_ne!(run.current_question().unwrap().id(), first);
        let progress = run.progress();
        assert_eq!(progress.step, 0);
        assert_eq!(progress.total_questions_asked, 1);
        assert_eq!(progress.question_number, 2);
    }

    #[tokio::test]
    async fn abandoning_stops_input_and_skips_submission() {
        let mut run = race(3).await;
        answer(&mut run, true);
        let cancelled = run.abandon();

        assert_eq!(cancelled.len(), 2);
        assert_eq!(run.status(), RunStatus::Abandoned);
        assert!(matches!(
            run.advance(AdvanceTrigger::Manual).await.unwrap(),
            RoundStep::Ignored(_)
        ));
        assert!(matches!(
            run.retry_submission().await,
            Err(RunError::Abandoned)
        ));
    }

    #[tokio::test]
    async fn retry_before_finishing_is_rejected() {
        let mut run = race(3).await;
        assert!(matches!(
            run.retry_submission().await,
            Err(RunError::NotFinished)
        ));
    }
}
