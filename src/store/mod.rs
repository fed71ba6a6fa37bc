//! Persistence layer: libSQL-backed storage for registrations and sessions.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{RegistrationStats, RegistrationStore, SessionStore, StoredRegistration};
