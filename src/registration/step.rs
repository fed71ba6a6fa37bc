//! Steps of the registration conversation and the answer keys they fill.

use serde::{Deserialize, Serialize};

/// One node of the fixed registration graph.
///
/// Progression: Welcome → (ProgramInfo →) PackageSelection → FirstName →
/// LastName → ParticipatedBefore → (ParticipationYear →) IsGraduate →
/// (GraduationYear →) Completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Welcome,
    ProgramInfo,
    PackageSelection,
    FirstName,
    LastName,
    ParticipatedBefore,
    ParticipationYear,
    IsGraduate,
    GraduationYear,
    Completed,
}

impl Step {
    /// Every step, in progression order.
    pub const ALL: [Step; 10] = [
        Step::Welcome,
        Step::ProgramInfo,
        Step::PackageSelection,
        Step::FirstName,
        Step::LastName,
        Step::ParticipatedBefore,
        Step::ParticipationYear,
        Step::IsGraduate,
        Step::GraduationYear,
        Step::Completed,
    ];

    /// The step every conversation starts at (and reset returns to).
    pub fn initial() -> Self {
        Self::Welcome
    }

    /// Whether this step is terminal (reaching it triggers persistence).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Position in the forward progression. Every transition strictly
    /// increases it.
    pub fn rank(&self) -> usize {
        Self::ALL
            .iter()
            .position(|s| s == self)
            .unwrap_or(Self::ALL.len())
    }

    /// The answer key this step records, if any.
    pub fn answer_key(&self) -> Option<AnswerKey> {
        match self {
            Self::Welcome | Self::ProgramInfo | Self::Completed => None,
            Self::PackageSelection => Some(AnswerKey::PackageType),
            Self::FirstName => Some(AnswerKey::FirstName),
            Self::LastName => Some(AnswerKey::LastName),
            Self::ParticipatedBefore => Some(AnswerKey::ParticipatedBefore),
            Self::ParticipationYear => Some(AnswerKey::ParticipationYear),
            Self::IsGraduate => Some(AnswerKey::IsGraduate),
            Self::GraduationYear => Some(AnswerKey::GraduationYear),
        }
    }
}

impl Default for Step {
    fn default() -> Self {
        Self::initial()
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Welcome => "welcome",
            Self::ProgramInfo => "program_info",
            Self::PackageSelection => "package_selection",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::ParticipatedBefore => "participated_before",
            Self::ParticipationYear => "participation_year",
            Self::IsGraduate => "is_graduate",
            Self::GraduationYear => "graduation_year",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// How a step interprets raw input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// One of the step's fixed option identifiers (rendered as buttons).
    Selection,
    /// Free text typed by the user.
    FreeText,
    /// The step accepts no input.
    None,
}

/// Keys of the Answer Store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKey {
    PackageType,
    FirstName,
    LastName,
    ParticipatedBefore,
    ParticipationYear,
    IsGraduate,
    GraduationYear,
}

impl std::fmt::Display for AnswerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PackageType => "package_type",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::ParticipatedBefore => "participated_before",
            Self::ParticipationYear => "participation_year",
            Self::IsGraduate => "is_graduate",
            Self::GraduationYear => "graduation_year",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_serde() {
        for step in Step::ALL {
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(format!("\"{step}\""), json, "mismatch for {step:?}");
        }
    }

    #[test]
    fn answer_key_display_matches_serde() {
        let keys = [
            AnswerKey::PackageType,
            AnswerKey::FirstName,
            AnswerKey::LastName,
            AnswerKey::ParticipatedBefore,
            AnswerKey::ParticipationYear,
            AnswerKey::IsGraduate,
            AnswerKey::GraduationYear,
        ];
        for key in keys {
            let json = serde_json::to_string(&key).unwrap();
            assert_eq!(format!("\"{key}\""), json);
        }
    }

    #[test]
    fn only_completed_is_terminal() {
        for step in Step::ALL {
            assert_eq!(step.is_terminal(), step == Step::Completed);
        }
    }

    #[test]
    fn rank_follows_declaration_order() {
        assert_eq!(Step::Welcome.rank(), 0);
        assert_eq!(Step::Completed.rank(), Step::ALL.len() - 1);
        assert!(Step::ParticipationYear.rank() < Step::IsGraduate.rank());
    }

    #[test]
    fn informational_steps_record_nothing() {
        assert_eq!(Step::Welcome.answer_key(), None);
        assert_eq!(Step::ProgramInfo.answer_key(), None);
        assert_eq!(Step::Completed.answer_key(), None);
        assert_eq!(
            Step::GraduationYear.answer_key(),
            Some(AnswerKey::GraduationYear)
        );
    }
}
