//! The registration conversation: step graph, answers, record building and
//! persistence.

pub mod answers;
pub mod machine;
pub mod package;
pub mod prompts;
pub mod reconciler;
pub mod record;
pub mod service;
pub mod session;
pub mod step;

pub use answers::{AnswerValue, Answers};
pub use machine::{Advance, ValidationError, advance};
pub use package::Package;
pub use reconciler::{MirrorOutcome, Reconciler, Reconciliation};
pub use record::{RegistrationRecord, build};
pub use service::{Command, Event, Input, RegistrationService, Reply};
pub use session::{ExternalIdentity, Session};
pub use step::{AnswerKey, InputKind, Step};
