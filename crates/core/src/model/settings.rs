use std::time::Duration;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("max steps must be > 0")]
    InvalidMaxSteps,

    #[error("primary feedback delay must be > 0")]
    InvalidPrimaryDelay,

    #[error("fallback feedback delay must be later than the primary delay")]
    InvalidFallbackDelay,

    #[error("leaderboard limit must be > 0")]
    InvalidLeaderboardLimit,
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Tunables of a race.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSettings {
    max_steps: u32,
    primary_feedback: Duration,
    fallback_feedback: Duration,
    leaderboard_limit: usize,
    duplicate_window_ms: u64,
}

impl GameSettings {
    pub const DEFAULT_MAX_STEPS: u32 = 23;
    pub const DEFAULT_PRIMARY_FEEDBACK_MS: u64 = 800;
    pub const DEFAULT_FALLBACK_FEEDBACK_MS: u64 = 1_800;
    pub const DEFAULT_LEADERBOARD_LIMIT: usize = 30;
    pub const DEFAULT_DUPLICATE_WINDOW_MS: u64 = 2_000;

    /// # Errors
    ///
    /// Returns `SettingsError` if any value is out of range.
    pub fn new(
        max_steps: u32,
        primary_feedback: Duration,
        fallback_feedback: Duration,
        leaderboard_limit: usize,
        duplicate_window_ms: u64,
    ) -> Result<Self, SettingsError> {
        if max_steps == 0 {
            return Err(SettingsError::InvalidMaxSteps);
        }
        if primary_feedback.is_zero() {
            return Err(SettingsError::InvalidPrimaryDelay);
        }
        if fallback_feedback <= primary_feedback {
            return Err(SettingsError::InvalidFallbackDelay);
        }
        if leaderboard_limit == 0 {
            return Err(SettingsError::InvalidLeaderboardLimit);
        }
        Ok(Self {
            max_steps,
            primary_feedback,
            fallback_feedback,
            leaderboard_limit,
            duplicate_window_ms,
        })
    }

    /// Same defaults with a shorter race, handy for demos and tests.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidMaxSteps` when `max_steps` is zero.
    pub fn with_max_steps(mut self, max_steps: u32) -> Result<Self, SettingsError> {
        if max_steps == 0 {
            return Err(SettingsError::InvalidMaxSteps);
        }
        self.max_steps = max_steps;
        Ok(self)
    }

    #[must_use]
    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    #[must_use]
    pub fn primary_feedback(&self) -> Duration {
        self.primary_feedback
    }

    #[must_use]
    pub fn fallback_feedback(&self) -> Duration {
        self.fallback_feedback
    }

    #[must_use]
    pub fn leaderboard_limit(&self) -> usize {
        self.leaderboard_limit
    }

    #[must_use]
    pub fn duplicate_window_ms(&self) -> u64 {
        self.duplicate_window_ms
    }
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            max_steps: Self::DEFAULT_MAX_STEPS,
            primary_feedback: Duration::from_millis(Self::DEFAULT_PRIMARY_FEEDBACK_MS),
            fallback_feedback: Duration::from_millis(Self::DEFAULT_FALLBACK_FEEDBACK_MS),
            leaderboard_limit: Self::DEFAULT_LEADERBOARD_LIMIT,
            duplicate_window_ms: Self::DEFAULT_DUPLICATE_WINDOW_MS,
        }
    }
}

//
// ─── JOURNEY ───────────────────────────────────────────────────────────────────
//

/// Named stop on the way home, reached at `step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Milestone {
    pub step: u32,
    pub label: &'static str,
}

pub const MILESTONES: [Milestone; 6] = [
    Milestone { step: 0, label: "Deep Space" },
    Milestone { step: 5, label: "Nebula" },
    Milestone { step: 10, label: "Asteroid Belt" },
    Milestone { step: 15, label: "Mars Orbit" },
    Milestone { step: 20, label: "Moon" },
    Milestone { step: 23, label: "Earth" },
];

/// Last milestone passed at `step`.
#[must_use]
pub fn milestone_at(step: u32) -> Milestone {
    MILESTONES
        .iter()
        .rev()
        .find(|m| m.step <= step)
        .copied()
        .unwrap_or(MILESTONES[0])
}
