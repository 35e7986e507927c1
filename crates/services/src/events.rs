//! Notifications the game emits for whatever is rendering it.

use serde::Serialize;

use race_core::model::{LeaderboardEntry, RunId};

use crate::round::RoundId;
use crate::run::FinalStats;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    QuestionChanged {
        round: RoundId,
        question_number: u32,
        prompt: String,
        options: Vec<String>,
    },
    AnswerLocked {
        round: RoundId,
        selected: String,
        correct: bool,
    },
    RoundAdvanced {
        round: RoundId,
        correct: bool,
        step: u32,
        total_questions_asked: u32,
    },
    /// An advance failed and the same question is answerable again.
    RoundReopened {
        round: RoundId,
    },
    RunCompleted {
        stats: FinalStats,
    },
    LeaderboardUpdated {
        entries: Vec<LeaderboardEntry>,
    },
    RunAbandoned {
        run_id: RunId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_a_type_tag() {
        let event = GameEvent::AnswerLocked {
            round: RoundId::new(4),
            selected: "Mars".into(),
            correct: true,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "answer_locked");
        assert_eq!(json["round"], 4);
        assert_eq!(json["correct"], true);
    }
}
