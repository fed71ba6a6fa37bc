//! Registration Record Builder.

use serde::{Deserialize, Serialize};

use crate::error::BuildError;

use super::answers::{AnswerValue, Answers};
use super::package::Package;
use super::session::{ExternalIdentity, Session};
use super::step::AnswerKey;

/// A finalized registration, ready for persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    pub telegram_id: ExternalIdentity,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub package_type: Package,
    pub participated_before: bool,
    /// Present iff `participated_before`.
    pub participation_year: Option<String>,
    pub is_graduate: bool,
    /// Present iff `is_graduate`.
    pub graduation_year: Option<String>,
}

/// Assemble a record from a session at the terminal step.
///
/// Identity and handle come from the session (transport-supplied); the rest
/// from the Answer Store. A year is only read when its flag is true, so a
/// stray year left behind a "no" answer never reaches the record. A "yes"
/// without a year is refused.
pub fn build(session: &Session) -> Result<RegistrationRecord, BuildError> {
    if !session.step.is_terminal() {
        return Err(BuildError::NotTerminal { step: session.step });
    }
    let answers = &session.answers;

    let package_type = required_text(answers, AnswerKey::PackageType)?
        .parse::<Package>()
        .map_err(|_| BuildError::InvalidAnswer {
            key: AnswerKey::PackageType,
        })?;
    let first_name = required_text(answers, AnswerKey::FirstName)?.to_string();
    let last_name = required_text(answers, AnswerKey::LastName)?.to_string();

    let participated_before = required_flag(answers, AnswerKey::ParticipatedBefore)?;
    let participation_year = paired_year(
        answers,
        participated_before,
        AnswerKey::ParticipatedBefore,
        AnswerKey::ParticipationYear,
    )?;

    let is_graduate = required_flag(answers, AnswerKey::IsGraduate)?;
    let graduation_year = paired_year(
        answers,
        is_graduate,
        AnswerKey::IsGraduate,
        AnswerKey::GraduationYear,
    )?;

    Ok(RegistrationRecord {
        telegram_id: session.identity,
        username: session.handle.clone(),
        first_name,
        last_name,
        package_type,
        participated_before,
        participation_year,
        is_graduate,
        graduation_year,
    })
}

fn required_text(answers: &Answers, key: AnswerKey) -> Result<&str, BuildError> {
    match answers.get(key) {
        None => Err(BuildError::MissingAnswer { key }),
        Some(AnswerValue::Text(s)) => Ok(s.as_str()),
        Some(_) => Err(BuildError::InvalidAnswer { key }),
    }
}

fn required_flag(answers: &Answers, key: AnswerKey) -> Result<bool, BuildError> {
    match answers.get(key) {
        None => Err(BuildError::MissingAnswer { key }),
        Some(AnswerValue::Flag(b)) => Ok(*b),
        Some(_) => Err(BuildError::InvalidAnswer { key }),
    }
}

fn paired_year(
    answers: &Answers,
    flag: bool,
    flag_key: AnswerKey,
    year_key: AnswerKey,
) -> Result<Option<String>, BuildError> {
    if !flag {
        return Ok(None);
    }
    match answers.get(year_key) {
        Some(AnswerValue::Text(year)) => Ok(Some(year.clone())),
        _ => Err(BuildError::YearMismatch {
            flag: flag_key,
            year: year_key,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::step::Step;

    fn completed_session(entries: &[(AnswerKey, AnswerValue)]) -> Session {
        let mut session = Session::new(ExternalIdentity(31337), Some("anna_i".into()));
        session.step = Step::Completed;
        for (key, value) in entries {
            session.answers.record(*key, value.clone());
        }
        session
    }

    fn base() -> Vec<(AnswerKey, AnswerValue)> {
        vec![
            (AnswerKey::PackageType, AnswerValue::Text("full".into())),
            (AnswerKey::FirstName, AnswerValue::Text("Anna".into())),
            (AnswerKey::LastName, AnswerValue::Text("Ivanova".into())),
        ]
    }

    #[test]
    fn builds_from_complete_answers() {
        let mut entries = base();
        entries.push((AnswerKey::ParticipatedBefore, AnswerValue::Flag(true)));
        entries.push((AnswerKey::ParticipationYear, AnswerValue::Text("2015".into())));
        entries.push((AnswerKey::IsGraduate, AnswerValue::Flag(false)));
        entries.push((AnswerKey::GraduationYear, AnswerValue::Absent));

        let record = build(&completed_session(&entries)).unwrap();
        assert_eq!(record.telegram_id, ExternalIdentity(31337));
        assert_eq!(record.username.as_deref(), Some("anna_i"));
        assert_eq!(record.package_type, Package::Full);
        assert_eq!(record.participation_year.as_deref(), Some("2015"));
        assert_eq!(record.graduation_year, None);
    }

    #[test]
    fn stray_year_is_ignored_when_flag_is_false() {
        let mut entries = base();
        entries.push((AnswerKey::ParticipatedBefore, AnswerValue::Flag(false)));
        entries.push((AnswerKey::ParticipationYear, AnswerValue::Text("2012".into())));
        entries.push((AnswerKey::IsGraduate, AnswerValue::Flag(false)));

        let record = build(&completed_session(&entries)).unwrap();
        assert!(!record.participated_before);
        assert_eq!(record.participation_year, None);
    }

    #[test]
    fn yes_without_year_is_refused() {
        let mut entries = base();
        entries.push((AnswerKey::ParticipatedBefore, AnswerValue::Flag(false)));
        entries.push((AnswerKey::IsGraduate, AnswerValue::Flag(true)));
        entries.push((AnswerKey::GraduationYear, AnswerValue::Absent));

        assert_eq!(
            build(&completed_session(&entries)),
            Err(BuildError::YearMismatch {
                flag: AnswerKey::IsGraduate,
                year: AnswerKey::GraduationYear,
            })
        );
    }

    #[test]
    fn missing_required_key_is_refused() {
        let entries = base();
        assert_eq!(
            build(&completed_session(&entries)),
            Err(BuildError::MissingAnswer {
                key: AnswerKey::ParticipatedBefore
            })
        );
    }

    #[test]
    fn wrong_value_type_is_refused() {
        let mut entries = base();
        entries.push((AnswerKey::ParticipatedBefore, AnswerValue::Text("yes".into())));
        entries.push((AnswerKey::IsGraduate, AnswerValue::Flag(false)));
        assert_eq!(
            build(&completed_session(&entries)),
            Err(BuildError::InvalidAnswer {
                key: AnswerKey::ParticipatedBefore
            })
        );
    }

    #[test]
    fn non_terminal_session_is_refused() {
        let mut session = completed_session(&base());
        session.step = Step::IsGraduate;
        assert_eq!(
            build(&session),
            Err(BuildError::NotTerminal {
                step: Step::IsGraduate
            })
        );
    }
}
