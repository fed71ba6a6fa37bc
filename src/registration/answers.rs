//! Answer Store: the per-conversation map of collected answers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::step::AnswerKey;

/// A single recorded answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    Text(String),
    Flag(bool),
    /// Explicitly recorded as not applicable (a skipped year).
    Absent,
}

/// Accumulated answers of one conversation.
///
/// Only grows during a conversation; it is cleared by reset, never by a
/// step transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Answers(BTreeMap<AnswerKey, AnswerValue>);

impl Answers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: AnswerKey) -> Option<&AnswerValue> {
        self.0.get(&key)
    }

    pub fn contains(&self, key: AnswerKey) -> bool {
        self.0.contains_key(&key)
    }

    /// Text answer, if the key holds one.
    pub fn text(&self, key: AnswerKey) -> Option<&str> {
        match self.0.get(&key) {
            Some(AnswerValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Boolean answer, if the key holds one.
    pub fn flag(&self, key: AnswerKey) -> Option<bool> {
        match self.0.get(&key) {
            Some(AnswerValue::Flag(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn record(&mut self, key: AnswerKey, value: AnswerValue) {
        self.0.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_accessors() {
        let mut answers = Answers::new();
        answers.record(AnswerKey::FirstName, AnswerValue::Text("Anna".into()));
        answers.record(AnswerKey::IsGraduate, AnswerValue::Flag(true));
        answers.record(AnswerKey::ParticipationYear, AnswerValue::Absent);

        assert_eq!(answers.text(AnswerKey::FirstName), Some("Anna"));
        assert_eq!(answers.flag(AnswerKey::FirstName), None);
        assert_eq!(answers.flag(AnswerKey::IsGraduate), Some(true));
        assert_eq!(answers.text(AnswerKey::ParticipationYear), None);
        assert!(answers.contains(AnswerKey::ParticipationYear));
        assert_eq!(answers.len(), 3);
    }

    #[test]
    fn serializes_as_flat_object() {
        let mut answers = Answers::new();
        answers.record(AnswerKey::PackageType, AnswerValue::Text("gala".into()));
        answers.record(AnswerKey::ParticipatedBefore, AnswerValue::Flag(false));

        let json = serde_json::to_value(&answers).unwrap();
        assert_eq!(json["package_type"]["kind"], "text");
        assert_eq!(json["package_type"]["value"], "gala");
        assert_eq!(json["participated_before"]["value"], false);

        let parsed: Answers = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, answers);
    }

    #[test]
    fn clear_empties_store() {
        let mut answers = Answers::new();
        answers.record(AnswerKey::LastName, AnswerValue::Text("Ivanova".into()));
        answers.clear();
        assert!(answers.is_empty());
    }
}
