use std::collections::HashSet;

use thiserror::Error;

use crate::model::ids::QuestionId;

/// Number of options every bundled question carries.
pub const DEFAULT_OPTION_COUNT: usize = 4;

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question id must not be blank")]
    BlankId,

    #[error("question {id} has an empty prompt")]
    EmptyPrompt { id: QuestionId },

    #[error("question {id} needs at least two options, got {len}")]
    TooFewOptions { id: QuestionId, len: usize },

    #[error("question {id} has a blank option at index {index}")]
    BlankOption { id: QuestionId, index: usize },

    #[error("question {id} marks option {index} as correct but has {len} options")]
    CorrectOutOfRange {
        id: QuestionId,
        index: usize,
        len: usize,
    },
}

/// A multiple-choice question. Immutable once constructed, and only
/// constructed through [`Question::new`]:
///
/// ```compile_fail
/// let question: exam_core::model::Question = serde_json::from_str("{}").unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<String>,
    correct_option: usize,
    explanation: Option<String>,
}

impl Question {
    /// Build a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the id or prompt is blank, there are fewer
    /// than two options, an option is blank, or `correct_option` is out of range.
    pub fn new(
        id: impl Into<QuestionId>,
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_option: usize,
        explanation: Option<String>,
    ) -> Result<Self, QuestionError> {
        let id = id.into();
        if id.is_blank() {
            return Err(QuestionError::BlankId);
        }

        let prompt = prompt.into().trim().to_owned();
        if prompt.is_empty() {
            return Err(QuestionError::EmptyPrompt { id });
        }

        if options.len() < 2 {
            return Err(QuestionError::TooFewOptions {
                id,
                len: options.len(),
            });
        }

        if let Some(index) = options.iter().position(|o| o.trim().is_empty()) {
            return Err(QuestionError::BlankOption { id, index });
        }

        if correct_option >= options.len() {
            return Err(QuestionError::CorrectOutOfRange {
                id,
                index: correct_option,
                len: options.len(),
            });
        }

        let explanation = explanation
            .map(|e| e.trim().to_owned())
            .filter(|e| !e.is_empty());

        Ok(Self {
            id,
            prompt,
            options,
            correct_option,
            explanation,
        })
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    #[must_use]
    pub fn correct_option(&self) -> usize {
        self.correct_option
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn is_correct(&self, option: usize) -> bool {
        self.correct_option == option
    }
}

/// Letter label shown next to an option (`A`, `B`, ...).
#[must_use]
pub fn option_label(index: usize) -> char {
    u8::try_from(index)
        .ok()
        .and_then(|i| b'A'.checked_add(i))
        .filter(u8::is_ascii_uppercase)
        .map_or('?', char::from)
}

//
// ─── QUESTION SET ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionSetError {
    #[error("question set is empty")]
    Empty,

    #[error("duplicate question id: {0}")]
    DuplicateId(QuestionId),

    #[error("question {id} has {found} options, expected {expected}")]
    OptionCountMismatch {
        id: QuestionId,
        expected: usize,
        found: usize,
    },
}

/// Ordered, non-empty list of questions with unique ids and a fixed option count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSet {
    questions: Vec<Question>,
}

impl QuestionSet {
    /// # Errors
    ///
    /// Returns `QuestionSetError` if the list is empty, ids repeat, or option
    /// counts differ between questions.
    pub fn new(questions: Vec<Question>) -> Result<Self, QuestionSetError> {
        let Some(first) = questions.first() else {
            return Err(QuestionSetError::Empty);
        };
        let expected = first.option_count();

        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            if !seen.insert(question.id()) {
                return Err(QuestionSetError::DuplicateId(question.id().clone()));
            }
            if question.option_count() != expected {
                return Err(QuestionSetError::OptionCountMismatch {
                    id: question.id().clone(),
                    expected,
                    found: question.option_count(),
                });
            }
        }

        Ok(Self { questions })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Always false for a constructed set; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn find(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<Question> {
        self.questions
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn options(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("option {i}")).collect()
    }

    fn question(id: &str) -> Question {
        Question::new(id, "What is testing?", options(4), 0, None).unwrap()
    }

    #[test]
    fn rejects_blank_id_and_prompt() {
        assert_eq!(
            Question::new(" ", "prompt", options(4), 0, None).unwrap_err(),
            QuestionError::BlankId
        );
        assert!(matches!(
            Question::new("q1", "   ", options(4), 0, None).unwrap_err(),
            QuestionError::EmptyPrompt { .. }
        ));
    }

    #[test]
    fn rejects_out_of_range_correct_option() {
        let err = Question::new("q1", "prompt", options(4), 4, None).unwrap_err();
        assert!(matches!(
            err,
            QuestionError::CorrectOutOfRange { index: 4, len: 4, .. }
        ));
    }

    #[test]
    fn rejects_blank_option_and_too_few() {
        let mut opts = options(4);
        opts[2] = "  ".into();
        assert!(matches!(
            Question::new("q1", "prompt", opts, 0, None).unwrap_err(),
            QuestionError::BlankOption { index: 2, .. }
        ));
        assert!(matches!(
            Question::new("q1", "prompt", options(1), 0, None).unwrap_err(),
            QuestionError::TooFewOptions { len: 1, .. }
        ));
    }

    #[test]
    fn blank_explanation_is_dropped() {
        let q = Question::new("q1", "prompt", options(4), 1, Some("  ".into())).unwrap();
        assert_eq!(q.explanation(), None);
        assert!(q.is_correct(1));
    }

    #[test]
    fn set_rejects_duplicates_and_empty() {
        assert_eq!(QuestionSet::new(Vec::new()).unwrap_err(), QuestionSetError::Empty);
        let err = QuestionSet::new(vec![question("q1"), question("q1")]).unwrap_err();
        assert_eq!(err, QuestionSetError::DuplicateId(QuestionId::new("q1")));
    }

    #[test]
    fn set_requires_fixed_option_count() {
        let odd = Question::new("q2", "prompt", options(3), 0, None).unwrap();
        let err = QuestionSet::new(vec![question("q1"), odd]).unwrap_err();
        assert!(matches!(
            err,
            QuestionSetError::OptionCountMismatch {
                expected: 4,
                found: 3,
                ..
            }
        ));
    }

    #[test]
    fn option_labels() {
        assert_eq!(option_label(0), 'A');
        assert_eq!(option_label(3), 'D');
        assert_eq!(option_label(40), '?');
    }
}
