use serde::Serialize;

use race_core::model::{LeaderboardEntry, RunId};
use race_core::rank::{RankInfo, calculate_accuracy, format_time_ms, share_message};

/// Local numbers of a finished run. Always available, even when the
/// leaderboard could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalStats {
    pub run_id: RunId,
    pub player_name: String,
    pub time_ms: u64,
    pub correct_answers: u32,
    pub total_questions: u32,
    pub accuracy: u32,
}

impl FinalStats {
    #[must_use]
    pub fn new(
        run_id: RunId,
        player_name: impl Into<String>,
        time_ms: u64,
        correct_answers: u32,
        total_questions: u32,
    ) -> Self {
        Self {
            run_id,
            player_name: player_name.into(),
            time_ms,
            correct_answers,
            total_questions,
            accuracy: calculate_accuracy(correct_answers, total_questions),
        }
    }

    #[must_use]
    pub fn formatted_time(&self) -> String {
        format_time_ms(self.time_ms)
    }

    #[must_use]
    pub fn share_message(&self) -> String {
        share_message(self.correct_answers, self.total_questions)
    }
}

/// What the results screen shows after a race.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub stats: FinalStats,
    pub rank: RankInfo,
    /// Top of the board after the submit.
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Set when the board could not be persisted; the run still counts locally.
    pub persist_error: Option<String>,
}

impl RunReport {
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.persist_error.is_none()
    }

    /// Whether to show the "faster than N% of racers" line.
    #[must_use]
    pub fn shows_percentile(&self) -> bool {
        self.rank.is_top_half()
    }

    /// Position of this run in [`RunReport::leaderboard`], if it made the cut.
    #[must_use]
    pub fn board_position(&self) -> Option<usize> {
        self.leaderboard
            .iter()
            .position(|e| e.run_id.as_ref() == Some(&self.stats.run_id))
    }
}
