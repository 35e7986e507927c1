use serde::{Deserialize, Serialize};

use crate::model::ids::RunId;

/// One finished run as stored on the leaderboard.
///
/// `run_id` is the idempotency key. Entries written before run ids existed
/// carry `None` and are deduplicated by their content signature instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    #[serde(alias = "name")]
    pub player_name: String,
    pub time_ms: u64,
    #[serde(default)]
    pub total_questions: u32,
    #[serde(default)]
    pub correct_answers: u32,
}

/// Content fingerprint used when an entry has no run id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntrySignature {
    player_name: String,
    time_ms: u64,
    total_questions: u32,
    correct_answers: u32,
}

/// Key under which two entries count as the same leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupeKey {
    Run(RunId),
    Content(EntrySignature),
}

impl LeaderboardEntry {
    #[must_use]
    pub fn new(
        run_id: RunId,
        player_name: impl Into<String>,
        time_ms: u64,
        total_questions: u32,
        correct_answers: u32,
    ) -> Self {
        Self {
            run_id: Some(run_id),
            player_name: player_name.into(),
            time_ms,
            total_questions,
            correct_answers,
        }
    }

    /// Entry without an idempotency key, as found in older data.
    #[must_use]
    pub fn legacy(
        player_name: impl Into<String>,
        time_ms: u64,
        total_questions: u32,
        correct_answers: u32,
    ) -> Self {
        Self {
            run_id: None,
            player_name: player_name.into(),
            time_ms,
            total_questions,
            correct_answers,
        }
    }

    #[must_use]
    pub fn signature(&self) -> EntrySignature {
        EntrySignature {
            player_name: self.player_name.clone(),
            time_ms: self.time_ms,
            total_questions: self.total_questions,
            correct_answers: self.correct_answers,
        }
    }

    #[must_use]
    pub fn dedupe_key(&self) -> DedupeKey {
        match &self.run_id {
            Some(id) => DedupeKey::Run(id.clone()),
            None => DedupeKey::Content(self.signature()),
        }
    }

    /// Heuristic match for resubmissions that predate run ids: same player,
    /// same question counts, and finishing times at most `window_ms` apart.
    #[must_use]
    pub fn resembles(&self, other: &LeaderboardEntry, window_ms: u64) -> bool {
        self.player_name == other.player_name
            && self.total_questions == other.total_questions
            && self.correct_answers == other.correct_answers
            && self.time_ms.abs_diff(other.time_ms) <= window_ms
    }
}
