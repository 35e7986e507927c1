use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;

use race_core::bank::QuestionBank;
use race_core::model::Question;

/// Deals questions from a shuffled copy of the bank.
///
/// The bank itself is never reordered. When a pass runs out, the sequencer
/// reshuffles and starts a new pass, so a race of any length always has a
/// next question; the first question of a new pass is never the one just
/// shown.
pub struct QuestionSequencer {
    rng: StdRng,
    questions: Vec<Question>,
    position: usize,
    pass: u32,
}

impl QuestionSequencer {
    #[must_use]
    pub fn new(bank: &QuestionBank) -> Self {
        Self::with_rng(bank, StdRng::from_rng(&mut rand::rng()))
    }

    #[must_use]
    pub fn with_seed(bank: &QuestionBank, seed: u64) -> Self {
        Self::with_rng(bank, StdRng::seed_from_u64(seed))
    }

    fn with_rng(bank: &QuestionBank, mut rng: StdRng) -> Self {
        let mut questions = bank.questions().to_vec();
        questions.shuffle(&mut rng);
        Self {
            rng,
            questions,
            position: 0,
            pass: 0,
        }
    }

    /// Question at the current position.
    ///
    /// A validated bank is never empty, so there is always one.
    #[must_use]
    pub fn current(&self) -> Option<&Question> {
        self.questions.get(self.position)
    }

    /// Step to the next question, reshuffling at the end of a pass.
    pub fn advance(&mut self) -> Option<&Question> {
        self.position += 1;
        if self.position >= self.questions.len() {
            self.start_new_pass();
        }
        self.current()
    }

    /// Index within the current pass.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Completed passes through the bank.
    #[must_use]
    pub fn pass(&self) -> u32 {
        self.pass
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    fn start_new_pass(&mut self) {
        let last = self.questions.last().map(Question::id);
        self.questions.shuffle(&mut self.rng);
        if self.questions.len() > 1 && self.questions.first().map(Question::id) == last {
            let swap_with = self.questions.len() - 1;
            self.questions.swap(0, swap_with);
        }
        self.position = 0;
        self.pass += 1;
        debug!(pass = self.pass, "question bank exhausted, reshuffled");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use race_core::model::{QuestionDraft, QuestionId};

    fn bank(size: u32) -> QuestionBank {
        let drafts = (1..=size)
            .map(|id| QuestionDraft {
                id: QuestionId::new(id),
                prompt: format!("Q{id}?"),
                options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                correct_answer: "a".into(),
            })
            .collect();
        QuestionBank::from_drafts(drafts).unwrap()
    }

    fn current_id(seq: &QuestionSequencer) -> QuestionId {
        seq.current().map(Question::id).unwrap()
    }

    #[test]
    fn one_pass_visits_every_question_once() {
        let bank = bank(10);
        let mut seq = QuestionSequencer::with_seed(&bank, 3);

        let mut seen = HashSet::new();
        seen.insert(current_id(&seq));
        for _ in 1..10 {
            seq.advance();
            assert!(seen.insert(current_id(&seq)));
        }
        assert_eq!(seq.pass(), 0);
        assert_eq!(seq.position(), 9);
    }

    #[test]
    fn source_bank_order_is_untouched() {
        let bank = bank(10);
        let before: Vec<_> = bank.questions().iter().map(Question::id).collect();
        let mut seq = QuestionSequencer::with_seed(&bank, 11);
        for _ in 0..25 {
            seq.advance();
        }
        let after: Vec<_> = bank.questions().iter().map(Question::id).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn running_out_starts_a_fresh_pass_without_repeating() {
        let bank = bank(3);
        let mut seq = QuestionSequencer::with_seed(&bank, 5);
        for _ in 0..40 {
            let before = current_id(&seq);
            seq.advance();
            assert_ne!(current_id(&seq), before);
        }
        assert!(seq.pass() >= 13);
    }

    #[test]
    fn single_question_bank_keeps_dealing() {
        let bank = bank(1);
        let mut seq = QuestionSequencer::with_seed(&bank, 1);
        assert_eq!(seq.advance().map(Question::id), Some(QuestionId::new(1)));
        assert_eq!(seq.pass(), 1);
    }
}
