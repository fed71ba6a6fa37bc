//! Version-tracked database migrations for the libSQL backend.
//!
//! Each migration has a version number and SQL. `run_migrations()` checks
//! the current version and applies only the new ones sequentially.
//! On first run against a legacy DB (a `registrations` table exists but no
//! `_migrations` table), it seeds V1 without re-creating tables.

use libsql::Connection;

use crate::error::DatabaseError;

/// A single migration step.
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. Add new versions to the end.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: r#"
            CREATE TABLE IF NOT EXISTS registrations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                telegram_id INTEGER NOT NULL UNIQUE,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                package_type TEXT NOT NULL,
                participated_before INTEGER NOT NULL,
                participation_year TEXT,
                is_graduate INTEGER NOT NULL,
                graduation_year TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_registrations_created ON registrations(created_at);

            CREATE TABLE IF NOT EXISTS sessions (
                identity INTEGER PRIMARY KEY,
                state TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
        "#,
    },
    Migration {
        version: 2,
        name: "registration_username",
        sql: r#"
            ALTER TABLE registrations ADD COLUMN username TEXT;
        "#,
    },
];

/// Run all pending migrations.
pub async fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        (),
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("Failed to create _migrations table: {e}")))?;

    let current_version = get_current_version(conn).await?;

    if current_version == 0 && legacy_tables_exist(conn).await? {
        // Legacy DB: the registrations table predates version tracking.
        // Make sure the session table exists, then seed V1.
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                identity INTEGER PRIMARY KEY,
                state TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )
        .await
        .map_err(|e| {
            DatabaseError::Migration(format!("Failed to create session table on legacy DB: {e}"))
        })?;

        seed_version(conn, 1, "initial_schema").await?;

        if column_exists(conn, "registrations", "username").await? {
            seed_version(conn, 2, "registration_username").await?;
        }
        tracing::info!("Legacy database detected, seeded migration version");
    }

    let current_version = get_current_version(conn).await?;
    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            conn.execute_batch(migration.sql).await.map_err(|e| {
                DatabaseError::Migration(format!(
                    "Migration V{} ({}) failed: {e}",
                    migration.version, migration.name
                ))
            })?;
            seed_version(conn, migration.version, migration.name).await?;
        }
    }

    tracing::info!(
        version = get_current_version(conn).await?,
        "Database migrations complete"
    );
    Ok(())
}

/// Get the highest applied migration version, or 0 if none.
async fn get_current_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to query migration version: {e}")))?;

    let row = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Migration(format!("Failed to read migration version: {e}")))?;

    match row {
        Some(row) => row.get::<i64>(0).map_err(|e| {
            DatabaseError::Migration(format!("Failed to parse migration version: {e}"))
        }),
        None => Ok(0),
    }
}

/// Check if a registrations table already exists.
async fn legacy_tables_exist(conn: &Connection) -> Result<bool, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='registrations'",
            (),
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("Failed to check legacy tables: {e}")))?;

    match rows.next().await {
        Ok(Some(row)) => Ok(row.get::<i64>(0).unwrap_or(0) > 0),
        Ok(None) => Ok(false),
        Err(e) => Err(DatabaseError::Query(format!("Failed to read legacy check: {e}"))),
    }
}

async fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
            libsql::params![table, column],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("Failed to inspect {table}: {e}")))?;

    match rows.next().await {
        Ok(Some(row)) => Ok(row.get::<i64>(0).unwrap_or(0) > 0),
        Ok(None) => Ok(false),
        Err(e) => Err(DatabaseError::Query(format!("Failed to inspect {table}: {e}"))),
    }
}

/// Insert a version record into `_migrations`.
async fn seed_version(conn: &Connection, version: i64, name: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO _migrations (version, name) VALUES (?1, ?2)",
        libsql::params![version, name],
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("Failed to record migration V{version}: {e}")))?;
    Ok(())
}
