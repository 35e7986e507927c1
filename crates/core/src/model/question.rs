use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::QuestionId;

/// Number of answer options every question carries.
pub const OPTION_COUNT: usize = 4;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question {id} has an empty prompt")]
    EmptyPrompt { id: QuestionId },

    #[error("question {id} must have exactly 4 options, found {found}")]
    OptionCount { id: QuestionId, found: usize },

    #[error("question {id} has a blank option")]
    BlankOption { id: QuestionId },

    #[error("question {id} repeats option {option:?}")]
    DuplicateOption { id: QuestionId, option: String },

    #[error("question {id}: correct answer {answer:?} is not one of the options")]
    AnswerNotInOptions { id: QuestionId, answer: String },

    #[error("question id {id} appears more than once in the bank")]
    DuplicateId { id: QuestionId },

    #[error("question bank is empty")]
    EmptyBank,

    #[error("question bank is not valid JSON: {0}")]
    Malformed(String),
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated question as it appears in the bank file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    pub id: QuestionId,
    #[serde(alias = "question")]
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

impl QuestionDraft {
    /// Check the draft and turn it into an immutable `Question`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt is blank, the options are not four
    /// distinct non-blank strings, or the correct answer is not one of them.
    pub fn validate(self) -> Result<Question, QuestionError> {
        let id = self.id;
        let prompt = self.prompt.trim().to_owned();
        if prompt.is_empty() {
            return Err(QuestionError::EmptyPrompt { id });
        }

        let found = self.options.len();
        let options: [String; OPTION_COUNT] = self
            .options
            .try_into()
            .map_err(|_| QuestionError::OptionCount { id, found })?;

        let mut seen = HashSet::with_capacity(OPTION_COUNT);
        for option in &options {
            if option.trim().is_empty() {
                return Err(QuestionError::BlankOption { id });
            }
            if !seen.insert(option.as_str()) {
                return Err(QuestionError::DuplicateOption {
                    id,
                    option: option.clone(),
                });
            }
        }

        if !seen.contains(self.correct_answer.as_str()) {
            return Err(QuestionError::AnswerNotInOptions {
                id,
                answer: self.correct_answer,
            });
        }

        Ok(Question {
            id,
            prompt,
            options,
            correct_answer: self.correct_answer,
        })
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A validated multiple-choice question.
///
/// The correct answer is always one of the four options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: [String; OPTION_COUNT],
    correct_answer: String,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Options in bank order. Presentation order is shuffled per round.
    #[must_use]
    pub fn options(&self) -> &[String; OPTION_COUNT] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    #[must_use]
    pub fn is_correct(&self, option: &str) -> bool {
        self.correct_answer == option
    }

    #[must_use]
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(options: &[&str], answer: &str) -> QuestionDraft {
        QuestionDraft {
            id: QuestionId::new(1),
            prompt: "Which planet is known as the Red Planet?".into(),
            options: options.iter().map(|s| (*s).to_owned()).collect(),
            correct_answer: answer.into(),
        }
    }

    #[test]
    fn valid_draft_becomes_question() {
        let q = draft(&["Venus", "Mars", "Jupiter", "Saturn"], "Mars")
            .validate()
            .unwrap();
        assert!(q.is_correct("Mars"));
        assert!(!q.is_correct("Venus"));
        assert!(q.has_option("Saturn"));
    }

    #[test]
    fn answer_must_be_an_option() {
        let err = draft(&["Venus", "Mars", "Jupiter", "Saturn"], "Pluto")
            .validate()
            .unwrap_err();
        assert!(matches!(err, QuestionError::AnswerNotInOptions { .. }));
    }

    #[test]
    fn rejects_wrong_option_count() {
        let err = draft(&["Venus", "Mars", "Jupiter"], "Mars")
            .validate()
            .unwrap_err();
        assert_eq!(
            err,
            QuestionError::OptionCount {
                id: QuestionId::new(1),
                found: 3
            }
        );
    }

    #[test]
    fn rejects_duplicate_options() {
        let err = draft(&["Mars", "Mars", "Jupiter", "Saturn"], "Mars")
            .validate()
            .unwrap_err();
        assert!(matches!(err, QuestionError::DuplicateOption { .. }));
    }

    #[test]
    fn rejects_blank_prompt() {
        let mut d = draft(&["Venus", "Mars", "Jupiter", "Saturn"], "Mars");
        d.prompt = "   ".into();
        assert!(matches!(
            d.validate(),
            Err(QuestionError::EmptyPrompt { .. })
        ));
    }

    #[test]
    fn legacy_question_key_is_accepted() {
        let json = r#"{"id":3,"question":"Q?","options":["a","b","c","d"],"correctAnswer":"c"}"#;
        let d: QuestionDraft = serde_json::from_str(json).unwrap();
        assert_eq!(d.prompt, "Q?");
        assert!(d.validate().is_ok());
    }
}
