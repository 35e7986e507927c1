//! Shared error types for the services crate.

use thiserror::Error;

use race_core::model::{PlayerError, QuestionError, RunSessionError};
use storage::sqlite::SqliteInitError;

/// Failure reported by an outcome handler while a round advances.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OutcomeError {
    #[error("no outcome handler is attached")]
    MissingHandler,
    #[error("outcome handler rejected the round: {0}")]
    Rejected(String),
    #[error(transparent)]
    Run(#[from] RunSessionError),
}

/// Errors emitted by the game session (player setup and run start).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GameError {
    #[error("enter a name before starting the race")]
    MissingPlayerName,
    #[error("a race is already in progress")]
    RunInProgress,
    #[error("no race is in progress")]
    NoActiveRun,
    #[error(transparent)]
    Player(#[from] PlayerError),
}

/// Errors emitted by the run orchestrator.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunError {
    #[error("the race is not finished yet")]
    NotFinished,
    #[error("the race was abandoned")]
    Abandoned,
    #[error(transparent)]
    Session(#[from] RunSessionError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Question(#[from] QuestionError),
}
