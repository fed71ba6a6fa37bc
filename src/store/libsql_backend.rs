//! libSQL backend: async `RegistrationStore` and `SessionStore` implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::registration::package::Package;
use crate::registration::record::RegistrationRecord;
use crate::registration::session::{ExternalIdentity, Session};
use crate::store::migrations;
use crate::store::traits::{RegistrationStats, RegistrationStore, SessionStore, StoredRegistration};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn init_schema(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(ndt.and_utc());
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(ndt.and_utc());
    }
    Err(DatabaseError::Serialization(format!("unrecognised timestamp {s:?}")))
}

fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

const REGISTRATION_COLUMNS: &str = "id, telegram_id, username, first_name, last_name, \
     package_type, participated_before, participation_year, is_graduate, graduation_year, \
     created_at, updated_at";

fn row_to_registration(row: &libsql::Row) -> Result<StoredRegistration, DatabaseError> {
    let parse = |e: libsql::Error| DatabaseError::Query(format!("registration row parse: {e}"));

    let id: i64 = row.get(0).map_err(parse)?;
    let telegram_id: i64 = row.get(1).map_err(parse)?;
    let username: Option<String> = row.get(2).map_err(parse)?;
    let first_name: String = row.get(3).map_err(parse)?;
    let last_name: String = row.get(4).map_err(parse)?;
    let package_str: String = row.get(5).map_err(parse)?;
    let participated_before: i64 = row.get(6).map_err(parse)?;
    let participation_year: Option<String> = row.get(7).map_err(parse)?;
    let is_graduate: i64 = row.get(8).map_err(parse)?;
    let graduation_year: Option<String> = row.get(9).map_err(parse)?;
    let created_str: String = row.get(10).map_err(parse)?;
    let updated_str: String = row.get(11).map_err(parse)?;

    let package_type: Package = package_str
        .parse()
        .map_err(DatabaseError::Serialization)?;

    Ok(StoredRegistration {
        id,
        record: RegistrationRecord {
            telegram_id: ExternalIdentity(telegram_id),
            username,
            first_name,
            last_name,
            package_type,
            participated_before: participated_before != 0,
            participation_year,
            is_graduate: is_graduate != 0,
            graduation_year,
        },
        created_at: parse_datetime(&created_str)?,
        updated_at: parse_datetime(&updated_str)?,
    })
}

fn to_count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

// ── Registrations ───────────────────────────────────────────────────

#[async_trait]
impl RegistrationStore for LibSqlBackend {
    async fn upsert_registration(
        &self,
        record: &RegistrationRecord,
    ) -> Result<StoredRegistration, DatabaseError> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();

        let mut rows = conn
            .query(
                &format!(
                    "INSERT INTO registrations (telegram_id, username, first_name, last_name,
                         package_type, participated_before, participation_year, is_graduate,
                         graduation_year, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
                     ON CONFLICT (telegram_id) DO UPDATE SET
                         username = excluded.username,
                         first_name = excluded.first_name,
                         last_name = excluded.last_name,
                         package_type = excluded.package_type,
                         participated_before = excluded.participated_before,
                         participation_year = excluded.participation_year,
                         is_graduate = excluded.is_graduate,
                         graduation_year = excluded.graduation_year,
                         updated_at = excluded.updated_at
                     RETURNING {REGISTRATION_COLUMNS}"
                ),
                params![
                    record.telegram_id.as_i64(),
                    opt_text(record.username.as_deref()),
                    record.first_name.as_str(),
                    record.last_name.as_str(),
                    record.package_type.id(),
                    record.participated_before as i64,
                    opt_text(record.participation_year.as_deref()),
                    record.is_graduate as i64,
                    opt_text(record.graduation_year.as_deref()),
                    now,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_registration: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_registration: {e}")))?
            .ok_or_else(|| {
                DatabaseError::Query("upsert_registration: no row returned".to_string())
            })?;

        let stored = row_to_registration(&row)?;
        debug!(
            telegram_id = %stored.record.telegram_id,
            id = stored.id,
            "Registration upserted"
        );
        Ok(stored)
    }

    async fn get_registration(
        &self,
        identity: ExternalIdentity,
    ) -> Result<Option<StoredRegistration>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE telegram_id = ?1"),
                params![identity.as_i64()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_registration: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_registration(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_registration: {e}"))),
        }
    }

    async fn list_registrations(&self) -> Result<Vec<StoredRegistration>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {REGISTRATION_COLUMNS} FROM registrations
                     ORDER BY created_at DESC, id DESC"
                ),
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_registrations: {e}")))?;

        let mut registrations = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_registrations: {e}")))?
        {
            registrations.push(row_to_registration(&row)?);
        }
        Ok(registrations)
    }

    async fn registration_stats(&self) -> Result<RegistrationStats, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT COUNT(*),
                     COALESCE(SUM(CASE WHEN package_type = 'business' THEN 1 ELSE 0 END), 0),
                     COALESCE(SUM(CASE WHEN package_type = 'gala' THEN 1 ELSE 0 END), 0),
                     COALESCE(SUM(CASE WHEN package_type = 'full' THEN 1 ELSE 0 END), 0),
                     COALESCE(SUM(participated_before), 0),
                     COALESCE(SUM(is_graduate), 0)
                 FROM registrations",
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("registration_stats: {e}")))?;

        let row = match rows.next().await {
            Ok(Some(row)) => row,
            Ok(None) => return Ok(RegistrationStats::default()),
            Err(e) => return Err(DatabaseError::Query(format!("registration_stats: {e}"))),
        };

        let get = |i: i32| -> Result<u64, DatabaseError> {
            row.get::<i64>(i)
                .map(to_count)
                .map_err(|e| DatabaseError::Query(format!("registration_stats row parse: {e}")))
        };

        Ok(RegistrationStats {
            total: get(0)?,
            business: get(1)?,
            gala: get(2)?,
            full: get(3)?,
            participated_before: get(4)?,
            graduates: get(5)?,
        })
    }

    async fn purge_registrations(&self) -> Result<usize, DatabaseError> {
        let conn = self.conn();
        let deleted = conn
            .execute("DELETE FROM registrations", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("purge_registrations: {e}")))?;

        info!(deleted, "Registrations purged");
        Ok(deleted as usize)
    }
}

// ── Sessions ────────────────────────────────────────────────────────

#[async_trait]
impl SessionStore for LibSqlBackend {
    async fn load_session(
        &self,
        identity: ExternalIdentity,
    ) -> Result<Option<Session>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT state FROM sessions WHERE identity = ?1",
                params![identity.as_i64()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("load_session: {e}")))?;

        let row = match rows.next().await {
            Ok(Some(row)) => row,
            Ok(None) => return Ok(None),
            Err(e) => return Err(DatabaseError::Query(format!("load_session: {e}"))),
        };

        let state: String = row
            .get(0)
            .map_err(|e| DatabaseError::Query(format!("load_session row parse: {e}")))?;
        let session: Session = serde_json::from_str(&state)
            .map_err(|e| DatabaseError::Serialization(format!("session {identity}: {e}")))?;
        Ok(Some(session))
    }

    async fn save_session(&self, session: &Session) -> Result<(), DatabaseError> {
        let conn = self.conn();
        let state = serde_json::to_string(session)
            .map_err(|e| DatabaseError::Serialization(format!("session: {e}")))?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO sessions (identity, state, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT (identity) DO UPDATE SET state = ?2, updated_at = ?3",
            params![session.identity.as_i64(), state, now],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("save_session: {e}")))?;

        Ok(())
    }

    async fn delete_session(&self, identity: ExternalIdentity) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        let deleted = conn
            .execute(
                "DELETE FROM sessions WHERE identity = ?1",
                params![identity.as_i64()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_session: {e}")))?;
        Ok(deleted > 0)
    }
}
