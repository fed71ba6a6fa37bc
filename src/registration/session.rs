//! Conversation session, one per external identity.

use serde::{Deserialize, Serialize};

use super::answers::Answers;
use super::step::Step;

/// Stable identity of the conversing user, supplied by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalIdentity(pub i64);

impl ExternalIdentity {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ExternalIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ExternalIdentity {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Persisted conversation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub identity: ExternalIdentity,
    /// Display handle (e.g. Telegram username), if the user has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    pub step: Step,
    pub answers: Answers,
    /// Set once the terminal step's persistence has committed. A registered
    /// session accepts no further mutating input until reset.
    #[serde(default)]
    pub registered: bool,
}

impl Session {
    pub fn new(identity: ExternalIdentity, handle: Option<String>) -> Self {
        Self {
            identity,
            handle,
            step: Step::initial(),
            answers: Answers::new(),
            registered: false,
        }
    }

    /// Discard all answers and return to the initial step.
    pub fn reset(&mut self) {
        self.step = Step::initial();
        self.answers.clear();
        self.registered = false;
    }

    /// Whether the session still accepts answers.
    pub fn is_open(&self) -> bool {
        !self.step.is_terminal() && !self.registered
    }

    /// Reached the terminal step but persistence has not committed yet.
    pub fn awaiting_persistence(&self) -> bool {
        self.step.is_terminal() && !self.registered
    }
}
