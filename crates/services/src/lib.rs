#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod events;
pub mod game_session;
pub mod round;
pub mod run;
pub mod sequencer;
pub mod startup;

pub use race_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, GameError, OutcomeError, RunError};
pub use events::GameEvent;
pub use game_session::GameSession;
pub use round::{
    AdvanceTrigger, FeedbackTimers, OutcomeHandler, RoundController, Selection, TimerTicket,
};
pub use run::{FinalStats, RoundStep, RunOrchestrator, RunProgress, RunReport, RunStatus};
pub use sequencer::QuestionSequencer;
pub use startup::{InitialScreen, IntroGate};
