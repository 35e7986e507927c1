use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::avatar::{AvatarConfig, PlayerName};
use crate::model::ids::RunId;
use crate::model::leaderboard::LeaderboardEntry;
use crate::time::elapsed_ms;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RunSessionError {
    #[error("run {0} is already finished")]
    AlreadyFinished(RunId),

    #[error("run {0} has not finished yet")]
    NotFinished(RunId),
}

/// Statistics of one play-through.
///
/// Created when the race starts, bumped as rounds resolve, and sealed with
/// an end time when the last progress step is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSession {
    run_id: RunId,
    player_name: PlayerName,
    avatar: AvatarConfig,
    score: u32,
    total_questions_asked: u32,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
}

impl RunSession {
    /// Start a run with a freshly minted run id.
    #[must_use]
    pub fn start(player_name: PlayerName, avatar: AvatarConfig, started_at: DateTime<Utc>) -> Self {
        Self::with_id(RunId::generate(), player_name, avatar, started_at)
    }

    #[must_use]
    pub fn with_id(
        run_id: RunId,
        player_name: PlayerName,
        avatar: AvatarConfig,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            run_id,
            player_name,
            avatar,
            score: 0,
            total_questions_asked: 0,
            started_at,
            ended_at: None,
        }
    }

    #[must_use]
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    #[must_use]
    pub fn player_name(&self) -> &PlayerName {
        &self.player_name
    }

    #[must_use]
    pub fn avatar(&self) -> AvatarConfig {
        self.avatar
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_questions_asked(&self) -> u32 {
        self.total_questions_asked
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.ended_at.is_some()
    }

    /// # Errors
    ///
    /// Returns `RunSessionError::AlreadyFinished` once the run is sealed.
    pub fn record_correct(&mut self) -> Result<(), RunSessionError> {
        self.ensure_open()?;
        self.score = self.score.saturating_add(1);
        self.total_questions_asked = self.total_questions_asked.saturating_add(1);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RunSessionError::AlreadyFinished` once the run is sealed.
    pub fn record_wrong(&mut self) -> Result<(), RunSessionError> {
        self.ensure_open()?;
        self.total_questions_asked = self.total_questions_asked.saturating_add(1);
        Ok(())
    }

    /// Seal the run. An end time earlier than the start is clamped to the start.
    ///
    /// # Errors
    ///
    /// Returns `RunSessionError::AlreadyFinished` if the run was already sealed.
    pub fn finish(&mut self, ended_at: DateTime<Utc>) -> Result<u64, RunSessionError> {
        self.ensure_open()?;
        let ended_at = ended_at.max(self.started_at);
        self.ended_at = Some(ended_at);
        Ok(elapsed_ms(self.started_at, ended_at))
    }

    /// Elapsed time so far, or the final time once finished.
    #[must_use]
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        elapsed_ms(self.started_at, self.ended_at.unwrap_or(now))
    }

    /// Leaderboard row for this run.
    ///
    /// # Errors
    ///
    /// Returns `RunSessionError::NotFinished` while the run is still open.
    pub fn to_entry(&self) -> Result<LeaderboardEntry, RunSessionError> {
        let ended_at = self
            .ended_at
            .ok_or_else(|| RunSessionError::NotFinished(self.run_id.clone()))?;
        Ok(LeaderboardEntry::new(
            self.run_id.clone(),
            self.player_name.as_str(),
            elapsed_ms(self.started_at, ended_at),
            self.total_questions_asked,
            self.score,
        ))
    }

    fn ensure_open(&self) -> Result<(), RunSessionError> {
        if self.is_finished() {
            return Err(RunSessionError::AlreadyFinished(self.run_id.clone()));
        }
        Ok(())
    }
}
