//! Placement, accuracy and display helpers for finished runs.

use crate::model::LeaderboardEntry;

/// Where a finishing time lands on a leaderboard snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankInfo {
    pub rank: usize,
    pub total: usize,
    pub percentile: u32,
}

impl RankInfo {
    /// The "faster than N% of racers" brag is only worth showing in the top half.
    #[must_use]
    pub fn is_top_half(&self) -> bool {
        self.percentile >= 50
    }
}

/// Rank a finishing time against a snapshot.
///
/// Rank is one plus the number of strictly faster entries. `total` never
/// drops below `rank`, which covers a snapshot that does not yet contain the
/// run being ranked; an empty snapshot therefore yields rank 1 of 1.
#[must_use]
pub fn compute_rank(time_ms: u64, entries: &[LeaderboardEntry]) -> RankInfo {
    let faster = entries.iter().filter(|e| e.time_ms < time_ms).count();
    let rank = faster + 1;
    let total = entries.len().max(rank);
    let at_or_behind = total - faster;
    RankInfo {
        rank,
        total,
        percentile: rounded_percent(at_or_behind as u64, total as u64),
    }
}

/// Percentage of correct answers, rounded. No questions counts as 100.
#[must_use]
pub fn calculate_accuracy(correct_answers: u32, total_questions: u32) -> u32 {
    if total_questions == 0 {
        return 100;
    }
    rounded_percent(u64::from(correct_answers), u64::from(total_questions))
}

// round-half-up of 100 * part / whole, whole > 0
fn rounded_percent(part: u64, whole: u64) -> u32 {
    let pct = (200 * part + whole) / (2 * whole);
    u32::try_from(pct).unwrap_or(u32::MAX)
}

/// Leaderboard time, `m:ss`.
#[must_use]
pub fn format_time_ms(ms: u64) -> String {
    let total_seconds = ms / 1000;
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Running race clock, `mm:ss`.
#[must_use]
pub fn format_clock(ms: u64) -> String {
    let total_seconds = ms / 1000;
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

#[must_use]
pub fn format_accuracy(entry: &LeaderboardEntry) -> String {
    format!(
        "{}%",
        calculate_accuracy(entry.correct_answers, entry.total_questions)
    )
}

#[must_use]
pub fn format_questions(total_questions: u32) -> String {
    format!("{total_questions} Q")
}

/// Text players copy to brag about a finished race.
#[must_use]
pub fn share_message(correct_answers: u32, total_questions: u32) -> String {
    let accuracy = calculate_accuracy(correct_answers, total_questions);
    format!(
        "I completed the Hamster Space Race with {accuracy}% accuracy in {total_questions} questions! Can you beat my score? Play now!"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(times: &[u64]) -> Vec<LeaderboardEntry> {
        times
            .iter()
            .enumerate()
            .map(|(i, t)| LeaderboardEntry::legacy(format!("P{i}"), *t, 23, 23))
            .collect()
    }

    #[test]
    fn middle_time_ranks_second_of_three() {
        let info = compute_rank(120_000, &board(&[90_000, 120_000, 150_000]));
        assert_eq!(info.rank, 2);
        assert_eq!(info.total, 3);
        assert_eq!(info.percentile, 67);
    }

    #[test]
    fn fastest_time_is_hundredth_percentile() {
        let info = compute_rank(60_000, &board(&[90_000, 120_000]));
        assert_eq!(info.rank, 1);
        assert_eq!(info.total, 2);
        assert_eq!(info.percentile, 100);
    }

    #[test]
    fn run_missing_from_snapshot_still_counts() {
        let info = compute_rank(200_000, &board(&[90_000, 120_000]));
        assert_eq!(info.rank, 3);
        assert_eq!(info.total, 3);
        assert_eq!(info.percentile, 33);
        assert!(!info.is_top_half());
    }

    #[test]
    fn empty_board_is_one_of_one() {
        let info = compute_rank(42_000, &[]);
        assert_eq!(
            info,
            RankInfo {
                rank: 1,
                total: 1,
                percentile: 100
            }
        );
    }

    #[test]
    fn ties_share_a_rank() {
        let info = compute_rank(90_000, &board(&[90_000, 90_000, 150_000]));
        assert_eq!(info.rank, 1);
    }

    #[test]
    fn accuracy_rounds_and_handles_zero() {
        assert_eq!(calculate_accuracy(23, 23), 100);
        assert_eq!(calculate_accuracy(0, 0), 100);
        assert_eq!(calculate_accuracy(23, 28), 82);
        assert_eq!(calculate_accuracy(1, 8), 13);
    }

    #[test]
    fn formats_times() {
        assert_eq!(format_time_ms(90_000), "1:30");
        assert_eq!(format_time_ms(5_999), "0:05");
        assert_eq!(format_clock(605_000), "10:05");
        assert_eq!(format_clock(0), "00:00");
    }

    #[test]
    fn formats_entry_columns() {
        let entry = LeaderboardEntry::legacy("Star", 135_000, 27, 23);
        assert_eq!(format_accuracy(&entry), "85%");
        assert_eq!(format_questions(27), "27 Q");
    }

    #[test]
    fn share_message_mentions_accuracy() {
        let msg = share_message(23, 23);
        assert!(msg.contains("100% accuracy in 23 questions"));
    }
}
