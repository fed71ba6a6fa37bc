//! Storage traits for the primary registration store and the session store.
//!
//! Both are implemented by [`LibSqlBackend`](crate::store::LibSqlBackend);
//! tests substitute their own implementations where a failure needs to be
//! simulated.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::DatabaseError;
use crate::registration::record::RegistrationRecord;
use crate::registration::session::{ExternalIdentity, Session};

/// A registration as persisted in the primary store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredRegistration {
    /// Primary-store row identifier. Stable across re-registrations.
    pub id: i64,
    #[serde(flatten)]
    pub record: RegistrationRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate counts over all registrations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistrationStats {
    pub total: u64,
    pub business: u64,
    pub gala: u64,
    pub full: u64,
    pub participated_before: u64,
    pub graduates: u64,
}

/// Primary store of registrations, keyed by external identity.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Insert or update the registration for `record.telegram_id`.
    ///
    /// Atomic per identity: concurrent calls for the same identity leave
    /// exactly one row. An update keeps `id` and `created_at` and overwrites
    /// everything else.
    async fn upsert_registration(
        &self,
        record: &RegistrationRecord,
    ) -> Result<StoredRegistration, DatabaseError>;

    async fn get_registration(
        &self,
        identity: ExternalIdentity,
    ) -> Result<Option<StoredRegistration>, DatabaseError>;

    /// All registrations, newest first.
    async fn list_registrations(&self) -> Result<Vec<StoredRegistration>, DatabaseError>;

    async fn registration_stats(&self) -> Result<RegistrationStats, DatabaseError>;

    /// Administrative purge. Returns the number of rows deleted.
    async fn purge_registrations(&self) -> Result<usize, DatabaseError>;
}

/// Conversation state persisted between turns.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load_session(
        &self,
        identity: ExternalIdentity,
    ) -> Result<Option<Session>, DatabaseError>;

    async fn save_session(&self, session: &Session) -> Result<(), DatabaseError>;

    /// Returns whether a session existed.
    async fn delete_session(&self, identity: ExternalIdentity) -> Result<bool, DatabaseError>;
}
