//! Registration state machine.
//!
//! The whole graph lives in [`TRANSITIONS`], an immutable table mapping each
//! step to its input kind, legal options, validator and transition function.
//! [`advance`] is a pure function of (session, input): no clock, no I/O, no
//! randomness.

use super::answers::{AnswerValue, Answers};
use super::package::Package;
use super::prompts;
use super::session::Session;
use super::step::{AnswerKey, InputKind, Step};

/// Inclusive bounds for the "when did you participate" year.
pub const PARTICIPATION_YEARS: (u16, u16) = (2000, 2024);
/// Inclusive bounds for the graduation year (strictly before 2026).
pub const GRADUATION_YEARS: (u16, u16) = (1990, 2025);
/// Minimum non-whitespace characters in a name.
pub const MIN_NAME_CHARS: usize = 2;

/// Why an input was rejected. Rejection never mutates the session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("input {input:?} is not one of the offered options")]
    InvalidOption { input: String },

    #[error("{field} needs at least {min_chars} characters")]
    TooShort { field: AnswerKey, min_chars: usize },

    #[error("{field} must be a four-digit year between {min} and {max}")]
    InvalidYear { field: AnswerKey, min: u16, max: u16 },

    #[error("conversation is closed")]
    SessionClosed,
}

impl ValidationError {
    /// Retry message for the user. `None` means the rejection is silent.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::TooShort {
                field: AnswerKey::FirstName,
                ..
            } => Some(prompts::FIRST_NAME_TOO_SHORT),
            Self::TooShort { .. } => Some(prompts::LAST_NAME_TOO_SHORT),
            Self::InvalidYear {
                field: AnswerKey::ParticipationYear,
                ..
            } => Some(prompts::INVALID_PARTICIPATION_YEAR),
            Self::InvalidYear { .. } => Some(prompts::INVALID_GRADUATION_YEAR),
            Self::InvalidOption { .. } | Self::SessionClosed => None,
        }
    }
}

type Validator = fn(&str) -> Result<Option<AnswerValue>, ValidationError>;
type Transition = fn(&Answers, &str) -> Step;

/// One row of the transition table.
pub struct StepSpec {
    pub step: Step,
    pub input: InputKind,
    /// Legal option identifiers for selection steps.
    pub options: &'static [&'static str],
    /// Every step `next` may return.
    pub targets: &'static [Step],
    /// Recorded as [`AnswerValue::Absent`] when this step's flag is `false`.
    pub skipped_on_no: Option<AnswerKey>,
    validate: Validator,
    next: Transition,
}

impl StepSpec {
    /// Validate input and compute the value to record, if any.
    pub fn validate(&self, input: &str) -> Result<Option<AnswerValue>, ValidationError> {
        match self.input {
            InputKind::None => Err(ValidationError::SessionClosed),
            InputKind::Selection if !self.options.contains(&input) => {
                Err(ValidationError::InvalidOption {
                    input: input.to_string(),
                })
            }
            _ => (self.validate)(input),
        }
    }

    pub fn next(&self, answers: &Answers, input: &str) -> Step {
        (self.next)(answers, input)
    }
}

const YES_NO: &[&str] = &[prompts::YES, prompts::NO];

/// The registration graph.
pub static TRANSITIONS: &[StepSpec] = &[
    StepSpec {
        step: Step::Welcome,
        input: InputKind::Selection,
        options: &[prompts::HOW_TO_PARTICIPATE, prompts::SHOW_PROGRAM],
        targets: &[Step::ProgramInfo, Step::PackageSelection],
        skipped_on_no: None,
        validate: navigation,
        next: |_, input| {
            if input == prompts::SHOW_PROGRAM {
                Step::ProgramInfo
            } else {
                Step::PackageSelection
            }
        },
    },
    StepSpec {
        step: Step::ProgramInfo,
        input: InputKind::Selection,
        options: &[prompts::HOW_TO_PARTICIPATE],
        targets: &[Step::PackageSelection],
        skipped_on_no: None,
        validate: navigation,
        next: |_, _| Step::PackageSelection,
    },
    StepSpec {
        step: Step::PackageSelection,
        input: InputKind::Selection,
        options: &["business", "gala", "full"],
        targets: &[Step::FirstName],
        skipped_on_no: None,
        validate: package,
        next: |_, _| Step::FirstName,
    },
    StepSpec {
        step: Step::FirstName,
        input: InputKind::FreeText,
        options: &[],
        targets: &[Step::LastName],
        skipped_on_no: None,
        validate: |input| name(AnswerKey::FirstName, input),
        next: |_, _| Step::LastName,
    },
    StepSpec {
        step: Step::LastName,
        input: InputKind::FreeText,
        options: &[],
        targets: &[Step::ParticipatedBefore],
        skipped_on_no: None,
        validate: |input| name(AnswerKey::LastName, input),
        next: |_, _| Step::ParticipatedBefore,
    },
    StepSpec {
        step: Step::ParticipatedBefore,
        input: InputKind::Selection,
        options: YES_NO,
        targets: &[Step::ParticipationYear, Step::IsGraduate],
        skipped_on_no: Some(AnswerKey::ParticipationYear),
        validate: yes_no,
        next: |answers, _| {
            if answers.flag(AnswerKey::ParticipatedBefore) == Some(true) {
                Step::ParticipationYear
            } else {
                Step::IsGraduate
            }
        },
    },
    StepSpec {
        step: Step::ParticipationYear,
        input: InputKind::FreeText,
        options: &[],
        targets: &[Step::IsGraduate],
        skipped_on_no: None,
        validate: |input| year(AnswerKey::ParticipationYear, PARTICIPATION_YEARS, input),
        next: |_, _| Step::IsGraduate,
    },
    StepSpec {
        step: Step::IsGraduate,
        input: InputKind::Selection,
        options: YES_NO,
        targets: &[Step::GraduationYear, Step::Completed],
        skipped_on_no: Some(AnswerKey::GraduationYear),
        validate: yes_no,
        next: |answers, _| {
            if answers.flag(AnswerKey::IsGraduate) == Some(true) {
                Step::GraduationYear
            } else {
                Step::Completed
            }
        },
    },
    StepSpec {
        step: Step::GraduationYear,
        input: InputKind::FreeText,
        options: &[],
        targets: &[Step::Completed],
        skipped_on_no: None,
        validate: |input| year(AnswerKey::GraduationYear, GRADUATION_YEARS, input),
        next: |_, _| Step::Completed,
    },
    StepSpec {
        step: Step::Completed,
        input: InputKind::None,
        options: &[],
        targets: &[],
        skipped_on_no: None,
        validate: |_| Err(ValidationError::SessionClosed),
        next: |_, _| Step::Completed,
    },
];

/// Look up the table row for a step.
pub fn spec(step: Step) -> &'static StepSpec {
    TRANSITIONS
        .iter()
        .find(|s| s.step == step)
        .unwrap_or(&TRANSITIONS[TRANSITIONS.len() - 1])
}

/// Result of feeding one input to the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advance {
    pub session: Session,
    pub next_step: Step,
    pub error: Option<ValidationError>,
}

impl Advance {
    pub fn is_accepted(&self) -> bool {
        self.error.is_none()
    }
}

/// Apply `input` to the session's current step.
///
/// On rejection the returned session equals the input session and
/// `next_step` is the unchanged current step.
pub fn advance(session: &Session, input: &str) -> Advance {
    let rejected = |error| Advance {
        session: session.clone(),
        next_step: session.step,
        error: Some(error),
    };

    if !session.is_open() {
        return rejected(ValidationError::SessionClosed);
    }

    let spec = spec(session.step);
    let value = match spec.validate(input) {
        Ok(value) => value,
        Err(e) => return rejected(e),
    };

    let mut updated = session.clone();
    if let (Some(key), Some(value)) = (session.step.answer_key(), value) {
        updated.answers.record(key, value);
    }
    if let Some(skipped) = spec.skipped_on_no {
        let flag = session.step.answer_key().and_then(|k| updated.answers.flag(k));
        if flag == Some(false) {
            updated.answers.record(skipped, AnswerValue::Absent);
        }
    }

    let next_step = spec.next(&updated.answers, input);
    updated.step = next_step;

    Advance {
        session: updated,
        next_step,
        error: None,
    }
}

// ── Validators ──────────────────────────────────────────────────────

fn navigation(_input: &str) -> Result<Option<AnswerValue>, ValidationError> {
    Ok(None)
}

fn package(input: &str) -> Result<Option<AnswerValue>, ValidationError> {
    input
        .parse::<Package>()
        .map(|p| Some(AnswerValue::Text(p.id().to_string())))
        .map_err(|_| ValidationError::InvalidOption {
            input: input.to_string(),
        })
}

fn yes_no(input: &str) -> Result<Option<AnswerValue>, ValidationError> {
    match input {
        prompts::YES => Ok(Some(AnswerValue::Flag(true))),
        prompts::NO => Ok(Some(AnswerValue::Flag(false))),
        other => Err(ValidationError::InvalidOption {
            input: other.to_string(),
        }),
    }
}

fn name(field: AnswerKey, input: &str) -> Result<Option<AnswerValue>, ValidationError> {
    let trimmed = input.trim();
    let visible = trimmed.chars().filter(|c| !c.is_whitespace()).count();
    if visible < MIN_NAME_CHARS {
        return Err(ValidationError::TooShort {
            field,
            min_chars: MIN_NAME_CHARS,
        });
    }
    Ok(Some(AnswerValue::Text(trimmed.to_string())))
}

fn year(
    field: AnswerKey,
    (min, max): (u16, u16),
    input: &str,
) -> Result<Option<AnswerValue>, ValidationError> {
    let trimmed = input.trim();
    let invalid = || ValidationError::InvalidYear { field, min, max };
    if trimmed.len() != 4 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let value: u16 = trimmed.parse().map_err(|_| invalid())?;
    if !(min..=max).contains(&value) {
        return Err(invalid());
    }
    Ok(Some(AnswerValue::Text(trimmed.to_string())))
}
