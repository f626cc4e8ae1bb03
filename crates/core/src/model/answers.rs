use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::ids::QuestionId;

/// Selected option per answered question. A key exists only once the question
/// has been answered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerMap {
    selected: BTreeMap<QuestionId, usize>,
}

impl AnswerMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the selection for `id`, returning the previous choice.
    pub(crate) fn upsert(&mut self, id: QuestionId, option: usize) -> Option<usize> {
        self.selected.insert(id, option)
    }

    #[must_use]
    pub fn get(&self, id: &QuestionId) -> Option<usize> {
        self.selected.get(id).copied()
    }

    #[must_use]
    pub fn contains(&self, id: &QuestionId) -> bool {
        self.selected.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QuestionId, usize)> {
        self.selected.iter().map(|(id, option)| (id, *option))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_replaces_previous_choice() {
        let mut answers = AnswerMap::new();
        assert_eq!(answers.upsert(QuestionId::new("q1"), 2), None);
        assert_eq!(answers.upsert(QuestionId::new("q1"), 0), Some(2));
        assert_eq!(answers.len(), 1);
        assert_eq!(answers.get(&QuestionId::new("q1")), Some(0));
        assert!(!answers.contains(&QuestionId::new("q2")));
    }
}
