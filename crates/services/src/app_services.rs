use std::sync::Arc;

use tracing::info;

use race_core::bank::QuestionBank;
use race_core::model::GameSettings;
use storage::leaderboard::{LeaderboardStore, SimulatedLatency};
use storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::game_session::GameSession;
use crate::startup::IntroGate;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    settings: GameSettings,
    bank: Arc<QuestionBank>,
    leaderboard: Arc<LeaderboardStore>,
    intro: IntroGate,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or the
    /// built-in question bank is invalid.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        settings: GameSettings,
        latency: SimulatedLatency,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::from_storage(storage, clock, settings, latency).await
    }

    /// Build services over process memory, optionally with hosted-style delays.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the built-in question bank is invalid.
    pub async fn in_memory(
        clock: Clock,
        settings: GameSettings,
        latency: SimulatedLatency,
    ) -> Result<Self, AppServicesError> {
        Self::from_storage(Storage::in_memory(), clock, settings, latency).await
    }

    /// # Errors
    ///
    /// Returns `AppServicesError` if the built-in question bank is invalid.
    pub async fn from_storage(
        storage: Storage,
        clock: Clock,
        settings: GameSettings,
        latency: SimulatedLatency,
    ) -> Result<Self, AppServicesError> {
        let bank = Arc::new(QuestionBank::builtin()?);
        let leaderboard = LeaderboardStore::new(Arc::clone(&storage.durable))
            .with_settings(&settings)
            .with_latency(latency);
        leaderboard.reload().await;
        info!(questions = bank.len(), "services ready");

        Ok(Self {
            clock,
            settings,
            bank,
            leaderboard: Arc::new(leaderboard),
            intro: IntroGate::new(storage.session),
        })
    }

    #[must_use]
    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    #[must_use]
    pub fn bank(&self) -> Arc<QuestionBank> {
        Arc::clone(&self.bank)
    }

    #[must_use]
    pub fn leaderboard(&self) -> Arc<LeaderboardStore> {
        Arc::clone(&self.leaderboard)
    }

    #[must_use]
    pub fn intro(&self) -> &IntroGate {
        &self.intro
    }

    /// A blank game session for a new player.
    #[must_use]
    pub fn new_game(&self) -> GameSession {
        GameSession::new(self.settings.clone(), self.clock)
    }
}
