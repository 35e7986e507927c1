//! Static question bank.

use std::collections::HashSet;

use crate::model::{Question, QuestionDraft, QuestionError};

const BUILTIN_BANK: &str = include_str!("../data/questions.json");

/// Validated, read-only list of questions in bank order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// Validate a list of drafts into a bank.
    ///
    /// # Errors
    ///
    /// Returns the first `QuestionError` found, `QuestionError::DuplicateId`
    /// when ids repeat, or `QuestionError::EmptyBank` for an empty list.
    pub fn from_drafts(drafts: Vec<QuestionDraft>) -> Result<Self, QuestionError> {
        if drafts.is_empty() {
            return Err(QuestionError::EmptyBank);
        }

        let mut ids = HashSet::with_capacity(drafts.len());
        let mut questions = Vec::with_capacity(drafts.len());
        for draft in drafts {
            if !ids.insert(draft.id) {
                return Err(QuestionError::DuplicateId { id: draft.id });
            }
            questions.push(draft.validate()?);
        }
        Ok(Self { questions })
    }

    /// Parse and validate a JSON array of questions.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::Malformed` if the text is not a JSON array of
    /// question objects, or any validation error from `from_drafts`.
    pub fn from_json(json: &str) -> Result<Self, QuestionError> {
        let drafts: Vec<QuestionDraft> =
            serde_json::from_str(json).map_err(|e| QuestionError::Malformed(e.to_string()))?;
        Self::from_drafts(drafts)
    }

    /// The bank compiled into the binary.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the embedded file fails validation.
    pub fn builtin() -> Result<Self, QuestionError> {
        Self::from_json(BUILTIN_BANK)
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GameSettings, QuestionId};

    #[test]
    fn builtin_bank_is_valid_and_covers_a_race() {
        let bank = QuestionBank::builtin().unwrap();
        assert!(bank.len() >= GameSettings::DEFAULT_MAX_STEPS as usize);
        for q in bank.questions() {
            assert!(q.has_option(q.correct_answer()));
        }
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let json = r#"[
            {"id":1,"question":"A?","options":["a","b","c","d"],"correctAnswer":"a"},
            {"id":1,"question":"B?","options":["a","b","c","d"],"correctAnswer":"b"}
        ]"#;
        assert_eq!(
            QuestionBank::from_json(json),
            Err(QuestionError::DuplicateId {
                id: QuestionId::new(1)
            })
        );
    }

    #[test]
    fn bad_answer_fails_at_load_time() {
        let json = r#"[{"id":9,"question":"A?","options":["a","b","c","d"],"correctAnswer":"e"}]"#;
        assert!(matches!(
            QuestionBank::from_json(json),
            Err(QuestionError::AnswerNotInOptions { .. })
        ));
    }

    #[test]
    fn non_array_is_malformed() {
        assert!(matches!(
            QuestionBank::from_json(r#"{"id":1}"#),
            Err(QuestionError::Malformed(_))
        ));
        assert_eq!(QuestionBank::from_json("[]"), Err(QuestionError::EmptyBank));
    }
}
