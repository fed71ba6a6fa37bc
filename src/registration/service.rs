//! Conversation boundary: load session, advance, persist, reply.
//!
//! Turns for the same identity are serialized by a per-identity lock that is
//! held across the whole turn, registration persistence included. Different
//! identities proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::DatabaseError;
use crate::store::SessionStore;

use super::machine;
use super::prompts::{self, Screen};
use super::reconciler::{MirrorOutcome, Reconciler};
use super::record;
use super::session::{ExternalIdentity, Session};
use super::step::Step;

/// Out-of-band commands recognized in any step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(Command),
    /// Free text or a selected option identifier.
    Answer(String),
}

/// One inbound turn, as delivered by a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub identity: ExternalIdentity,
    pub handle: Option<String>,
    pub input: Input,
}

impl Event {
    pub fn new(identity: ExternalIdentity, handle: Option<String>, input: Input) -> Self {
        Self {
            identity,
            handle,
            input,
        }
    }

    /// Classify raw message text. `/start` and `/reset` (optionally
    /// addressed as `/start@bot_name`) are commands; anything else is an
    /// answer.
    pub fn from_text(identity: ExternalIdentity, handle: Option<String>, text: &str) -> Self {
        let input = match parse_command(text) {
            Some(command) => Input::Command(command),
            None => Input::Answer(text.to_string()),
        };
        Self::new(identity, handle, input)
    }
}

fn parse_command(text: &str) -> Option<Command> {
    let word = text.trim().split_whitespace().next()?;
    let name = word.strip_prefix('/')?;
    let name = name.split('@').next().unwrap_or(name);
    match name {
        "start" => Some(Command::Start),
        "reset" => Some(Command::Reset),
        _ => None,
    }
}

/// What to send back for one turn. Empty when the input is silently ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    /// Step the session is at after the turn, when known.
    pub step: Option<Step>,
    /// Short message shown before the screen (validation or failure text).
    pub notice: Option<String>,
    pub screen: Option<Screen>,
}

impl Reply {
    fn at(step: Step) -> Self {
        Self {
            step: Some(step),
            notice: None,
            screen: Some(prompts::screen(step)),
        }
    }

    fn notice(step: Option<Step>, text: &str) -> Self {
        Self {
            step,
            notice: Some(text.to_string()),
            screen: None,
        }
    }

    fn silent(step: Step) -> Self {
        Self {
            step: Some(step),
            notice: None,
            screen: None,
        }
    }

    fn retry_later() -> Self {
        Self::notice(None, prompts::RETRY_LATER_TEXT)
    }

    pub fn is_empty(&self) -> bool {
        self.notice.is_none() && self.screen.is_none()
    }
}

pub struct RegistrationService {
    sessions: Arc<dyn SessionStore>,
    reconciler: Reconciler,
    store_timeout: Duration,
    locks: Mutex<HashMap<ExternalIdentity, Arc<Mutex<()>>>>,
}

impl RegistrationService {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        reconciler: Reconciler,
        store_timeout: Duration,
    ) -> Self {
        Self {
            sessions,
            reconciler,
            store_timeout,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Process one turn to completion.
    pub async fn handle(&self, event: Event) -> Reply {
        let identity = event.identity;
        let lock = self.identity_lock(identity).await;
        let reply = {
            let _guard = lock.lock().await;
            self.turn(event).await
        };
        self.release_lock(identity, lock).await;
        reply
    }

    async fn turn(&self, event: Event) -> Reply {
        let mut session = match self.load(event.identity).await {
            Ok(Some(session)) => session,
            Ok(None) => Session::new(event.identity, None),
            Err(e) => {
                warn!(telegram_id = %event.identity, error = %e, "Session load failed");
                return Reply::retry_later();
            }
        };
        session.handle = event.handle;

        match event.input {
            Input::Command(command) => self.restart(session, command).await,
            Input::Answer(text) if session.awaiting_persistence() => {
                debug!(telegram_id = %session.identity, input = %text, "Retrying registration");
                self.finalize(session).await
            }
            Input::Answer(text) => self.answer(session, &text).await,
        }
    }

    async fn restart(&self, mut session: Session, command: Command) -> Reply {
        session.reset();
        if let Err(e) = self.save(&session).await {
            warn!(telegram_id = %session.identity, error = %e, "Session save failed");
            return Reply::retry_later();
        }
        info!(telegram_id = %session.identity, command = ?command, "Conversation restarted");
        Reply::at(Step::Welcome)
    }

    async fn answer(&self, session: Session, text: &str) -> Reply {
        let advance = machine::advance(&session, text);

        if let Some(err) = &advance.error {
            debug!(
                telegram_id = %session.identity,
                step = %session.step,
                error = %err,
                "Input rejected"
            );
            return match err.user_message() {
                Some(message) => Reply::notice(Some(session.step), message),
                None => Reply::silent(session.step),
            };
        }

        let session = advance.session;
        if session.step.is_terminal() {
            return self.finalize(session).await;
        }

        if let Err(e) = self.save(&session).await {
            warn!(telegram_id = %session.identity, error = %e, "Session save failed");
            return Reply::retry_later();
        }
        debug!(telegram_id = %session.identity, step = %session.step, "Step advanced");
        Reply::at(session.step)
    }

    /// Build the record and hand it to the reconciler. The session is saved
    /// at the terminal step either way; only a committed primary write marks
    /// it registered.
    async fn finalize(&self, mut session: Session) -> Reply {
        let record = match record::build(&session) {
            Ok(record) => record,
            Err(e) => {
                error!(telegram_id = %session.identity, error = %e, "Answers do not form a record; restarting");
                session.reset();
                if let Err(e) = self.save(&session).await {
                    warn!(telegram_id = %session.identity, error = %e, "Session save failed");
                    return Reply::retry_later();
                }
                return Reply::at(Step::Welcome);
            }
        };

        let reply = match self.reconciler.upsert(&record).await {
            Ok(reconciliation) => {
                let stored = &reconciliation.stored;
                match &reconciliation.mirror {
                    MirrorOutcome::Failed(e) => warn!(
                        telegram_id = %record.telegram_id,
                        error = %e,
                        "Registration stored but mirror update failed"
                    ),
                    outcome => debug!(telegram_id = %record.telegram_id, outcome = ?outcome, "Mirror updated"),
                }
                info!(
                    telegram_id = %record.telegram_id,
                    id = stored.id,
                    package = %record.package_type,
                    "Registration saved"
                );
                session.registered = true;
                Reply::at(Step::Completed)
            }
            Err(e) => {
                warn!(telegram_id = %record.telegram_id, error = %e, "Registration write failed");
                Reply::notice(Some(Step::Completed), prompts::REGISTRATION_FAILED_TEXT)
            }
        };

        if let Err(e) = self.save(&session).await {
            // The primary write (if any) already committed; the reply stands.
            warn!(telegram_id = %session.identity, error = %e, "Session save failed after registration");
        }
        reply
    }

    async fn identity_lock(&self, identity: ExternalIdentity) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(identity).or_default().clone()
    }

    /// Drop the identity's lock entry once no other turn holds or awaits it.
    async fn release_lock(&self, identity: ExternalIdentity, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        drop(lock);
        if locks
            .get(&identity)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(&identity);
        }
    }

    async fn load(&self, identity: ExternalIdentity) -> Result<Option<Session>, DatabaseError> {
        tokio::time::timeout(self.store_timeout, self.sessions.load_session(identity))
            .await
            .map_err(|_| DatabaseError::Timeout {
                operation: "load_session",
                timeout: self.store_timeout,
            })?
    }

    async fn save(&self, session: &Session) -> Result<(), DatabaseError> {
        tokio::time::timeout(self.store_timeout, self.sessions.save_session(session))
            .await
            .map_err(|_| DatabaseError::Timeout {
                operation: "save_session",
                timeout: self.store_timeout,
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::MemorySheet;
    use crate::store::{LibSqlBackend, RegistrationStore};
    use async_trait::async_trait;

    const TIMEOUT: Duration = Duration::from_secs(5);
    const ANNA: ExternalIdentity = ExternalIdentity(4242);

    async fn service() -> (Arc<LibSqlBackend>, Arc<MemorySheet>, RegistrationService) {
        let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let sheet = Arc::new(MemorySheet::with_header());
        let reconciler = Reconciler::new(db.clone(), Some(sheet.clone()), TIMEOUT);
        let service = RegistrationService::new(db.clone(), reconciler, TIMEOUT);
        (db, sheet, service)
    }

    async fn say(service: &RegistrationService, text: &str) -> Reply {
        service
            .handle(Event::from_text(ANNA, Some("anna_i".into()), text))
            .await
    }

    #[test]
    fn command_parsing() {
        assert_eq!(parse_command("/start"), Some(Command::Start));
        assert_eq!(parse_command("  /reset  "), Some(Command::Reset));
        assert_eq!(parse_command("/start@conf_bot"), Some(Command::Start));
        assert_eq!(parse_command("/start ref123"), Some(Command::Start));
        assert_eq!(parse_command("/help"), None);
        assert_eq!(parse_command("start"), None);
        assert_eq!(parse_command(""), None);
    }

    #[tokio::test]
    async fn start_renders_welcome() {
        let (_db, _sheet, service) = service().await;
        let reply = say(&service, "/start").await;
        assert_eq!(reply.step, Some(Step::Welcome));
        assert_eq!(reply.screen, Some(prompts::screen(Step::Welcome)));
        assert!(reply.notice.is_none());
    }

    #[tokio::test]
    async fn first_contact_without_start_is_treated_as_welcome_input() {
        let (_db, _sheet, service) = service().await;
        let reply = say(&service, prompts::HOW_TO_PARTICIPATE).await;
        assert_eq!(reply.step, Some(Step::PackageSelection));
    }

    #[tokio::test]
    async fn short_name_gets_retry_text_and_keeps_step() {
        let (db, _sheet, service) = service().await;
        say(&service, "/start").await;
        say(&service, prompts::HOW_TO_PARTICIPATE).await;
        say(&service, "gala").await;

        let reply = say(&service, "A").await;
        assert_eq!(reply.step, Some(Step::FirstName));
        assert_eq!(reply.notice.as_deref(), Some(prompts::FIRST_NAME_TOO_SHORT));
        assert!(reply.screen.is_none());

        let session = db.load_session(ANNA).await.unwrap().unwrap();
        assert_eq!(session.step, Step::FirstName);
    }

    #[tokio::test]
    async fn unknown_option_is_silent() {
        let (_db, _sheet, service) = service().await;
        say(&service, "/start").await;
        say(&service, prompts::HOW_TO_PARTICIPATE).await;

        let reply = say(&service, "platinum").await;
        assert!(reply.is_empty());
        assert_eq!(reply.step, Some(Step::PackageSelection));
    }

    #[tokio::test]
    async fn full_conversation_registers_once() {
        let (db, sheet, service) = service().await;
        for input in [
            "/start",
            prompts::SHOW_PROGRAM,
            prompts::HOW_TO_PARTICIPATE,
            "business",
            "Anna",
            "Ivanova",
            prompts::NO,
            prompts::YES,
            "2019",
        ] {
            say(&service, input).await;
        }

        let stored = db.get_registration(ANNA).await.unwrap().unwrap();
        assert_eq!(stored.record.first_name, "Anna");
        assert_eq!(stored.record.graduation_year.as_deref(), Some("2019"));
        assert_eq!(stored.record.participation_year, None);
        assert_eq!(sheet.rows().await.len(), 2);

        let session = db.load_session(ANNA).await.unwrap().unwrap();
        assert!(session.registered);

        // Closed conversation: further input is ignored.
        let reply = say(&service, "hello?").await;
        assert!(reply.is_empty());
        assert_eq!(db.list_registrations().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn lock_entries_are_released_after_each_turn() {
        let (_db, _sheet, service) = service().await;
        for id in 1..=50 {
            service
                .handle(Event::from_text(ExternalIdentity(id), None, "/start"))
                .await;
        }
        assert!(service.locks.lock().await.is_empty());

        say(&service, "/start").await;
        say(&service, prompts::HOW_TO_PARTICIPATE).await;
        assert!(service.locks.lock().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_turns_leave_no_lock_behind() {
        let (_db, _sheet, service) = service().await;
        let service = Arc::new(service);

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..40 {
            let service = Arc::clone(&service);
            let identity = ExternalIdentity(i % 4);
            tasks.spawn(async move {
                service
                    .handle(Event::from_text(identity, None, "/start"))
                    .await
            });
        }
        while let Some(reply) = tasks.join_next().await {
            assert_eq!(reply.unwrap().step, Some(Step::Welcome));
        }
        assert!(service.locks.lock().await.is_empty());
    }

    struct OfflineSessions;

    #[async_trait]
    impl SessionStore for OfflineSessions {
        async fn load_session(
            &self,
            _identity: ExternalIdentity,
        ) -> Result<Option<Session>, DatabaseError> {
            Err(DatabaseError::Pool("connection refused".into()))
        }
        async fn save_session(&self, _session: &Session) -> Result<(), DatabaseError> {
            Err(DatabaseError::Pool("connection refused".into()))
        }
        async fn delete_session(&self, _identity: ExternalIdentity) -> Result<bool, DatabaseError> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn session_store_outage_asks_to_retry() {
        let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let reconciler = Reconciler::new(db, None, TIMEOUT);
        let service = RegistrationService::new(Arc::new(OfflineSessions), reconciler, TIMEOUT);

        let reply = say(&service, "/start").await;
        assert_eq!(reply.notice.as_deref(), Some(prompts::RETRY_LATER_TEXT));
        assert!(reply.step.is_none());
    }
}
