//! Persistence Reconciler.
//!
//! Writes a finalized record to the primary store (authoritative, unique per
//! identity) and then mirrors the stored row to the spreadsheet. Mirror
//! failures never undo or block the primary write; they surface as a
//! [`MirrorOutcome`] for the caller to log.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{DatabaseError, MirrorError};
use crate::mirror::MirrorSheet;
use crate::mirror::row::{IDENTITY_COLUMN, mirror_row};
use crate::store::{RegistrationStore, StoredRegistration};

use super::record::RegistrationRecord;

/// What happened on the mirror side of a reconciliation.
#[derive(Debug)]
pub enum MirrorOutcome {
    /// Existing row `row` (1-based) was overwritten.
    Updated { row: usize },
    Appended,
    /// No mirror configured.
    Disabled,
    Failed(MirrorError),
}

impl MirrorOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Result of a successful primary write.
#[derive(Debug)]
pub struct Reconciliation {
    pub stored: StoredRegistration,
    pub mirror: MirrorOutcome,
}

pub struct Reconciler {
    store: Arc<dyn RegistrationStore>,
    mirror: Option<Arc<dyn MirrorSheet>>,
    timeout: Duration,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn RegistrationStore>,
        mirror: Option<Arc<dyn MirrorSheet>>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            mirror,
            timeout,
        }
    }

    /// Upsert `record` and mirror the stored row.
    ///
    /// Returns an error only when the primary write fails or times out; the
    /// mirror is not attempted in that case.
    pub async fn upsert(
        &self,
        record: &RegistrationRecord,
    ) -> Result<Reconciliation, DatabaseError> {
        let stored = tokio::time::timeout(self.timeout, self.store.upsert_registration(record))
            .await
            .map_err(|_| DatabaseError::Timeout {
                operation: "upsert_registration",
                timeout: self.timeout,
            })??;

        let mirror = self.mirror(&stored).await;
        Ok(Reconciliation { stored, mirror })
    }

    /// Write one stored registration to the mirror: overwrite the first row
    /// whose identity cell matches, or append a new row.
    pub async fn mirror(&self, stored: &StoredRegistration) -> MirrorOutcome {
        let Some(sheet) = &self.mirror else {
            return MirrorOutcome::Disabled;
        };

        match tokio::time::timeout(self.timeout, mirror_to(sheet.as_ref(), stored)).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => MirrorOutcome::Failed(e),
            Err(_) => MirrorOutcome::Failed(MirrorError::Timeout(self.timeout)),
        }
    }
}

async fn mirror_to(
    sheet: &dyn MirrorSheet,
    stored: &StoredRegistration,
) -> Result<MirrorOutcome, MirrorError> {
    let identity = stored.record.telegram_id.to_string();
    let values = mirror_row(stored);

    let column = sheet.column_values(IDENTITY_COLUMN).await?;
    let existing = column
        .iter()
        .position(|cell| cell.trim() == identity)
        .map(|idx| idx + 1);

    match existing {
        Some(row) => {
            sheet.update_row(row, &values).await?;
            Ok(MirrorOutcome::Updated { row })
        }
        None => {
            sheet.append_row(&values).await?;
            Ok(MirrorOutcome::Appended)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::MemorySheet;
    use crate::registration::package::Package;
    use crate::registration::session::ExternalIdentity;
    use crate::store::{LibSqlBackend, RegistrationStats};
    use async_trait::async_trait;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn record(telegram_id: i64, package: Package) -> RegistrationRecord {
        RegistrationRecord {
            telegram_id: ExternalIdentity(telegram_id),
            username: Some("anna_i".into()),
            first_name: "Anna".into(),
            last_name: "Ivanova".into(),
            package_type: package,
            participated_before: true,
            participation_year: Some("2015".into()),
            is_graduate: false,
            graduation_year: None,
        }
    }

    async fn setup() -> (Arc<LibSqlBackend>, Arc<MemorySheet>, Reconciler) {
        let store = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let sheet = Arc::new(MemorySheet::with_header());
        let reconciler = Reconciler::new(store.clone(), Some(sheet.clone()), TIMEOUT);
        (store, sheet, reconciler)
    }

    #[tokio::test]
    async fn first_upsert_appends() {
        let (_store, sheet, reconciler) = setup().await;
        let result = reconciler.upsert(&record(123, Package::Full)).await.unwrap();

        assert!(matches!(result.mirror, MirrorOutcome::Appended));
        let rows = sheet.rows().await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][1], "123");
    }

    #[tokio::test]
    async fn repeated_upsert_updates_same_row() {
        let (store, sheet, reconciler) = setup().await;
        let first = reconciler.upsert(&record(123, Package::Full)).await.unwrap();
        let second = reconciler.upsert(&record(123, Package::Gala)).await.unwrap();

        assert_eq!(second.stored.id, first.stored.id);
        assert_eq!(second.stored.created_at, first.stored.created_at);
        assert!(matches!(second.mirror, MirrorOutcome::Updated { row: 2 }));

        let rows = sheet.rows().await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][5], "Гала-ужин - 3 490₽");
        assert_eq!(store.list_registrations().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn identity_match_ignores_surrounding_whitespace() {
        let (_store, sheet, reconciler) = setup().await;
        sheet
            .append_row(&[serde_json::json!(""), serde_json::json!(" 123 ")])
            .await
            .unwrap();

        let result = reconciler.upsert(&record(123, Package::Business)).await.unwrap();
        assert!(matches!(result.mirror, MirrorOutcome::Updated { row: 2 }));
    }

    #[tokio::test]
    async fn mirror_failure_keeps_primary_write() {
        let (store, sheet, reconciler) = setup().await;
        sheet.set_unavailable(true);

        let result = reconciler.upsert(&record(5, Package::Full)).await.unwrap();
        assert!(result.mirror.is_failed());
        assert!(
            store
                .get_registration(ExternalIdentity(5))
                .await
                .unwrap()
                .is_some()
        );

        // Once the sheet is back, re-mirroring the stored row appends it.
        sheet.set_unavailable(false);
        let outcome = reconciler.mirror(&result.stored).await;
        assert!(matches!(outcome, MirrorOutcome::Appended));
    }

    #[tokio::test]
    async fn no_mirror_is_disabled() {
        let store = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let reconciler = Reconciler::new(store, None, TIMEOUT);
        let result = reconciler.upsert(&record(1, Package::Full)).await.unwrap();
        assert!(matches!(result.mirror, MirrorOutcome::Disabled));
    }

    struct FailingStore;

    #[async_trait]
    impl RegistrationStore for FailingStore {
        async fn upsert_registration(
            &self,
            _record: &RegistrationRecord,
        ) -> Result<StoredRegistration, DatabaseError> {
            Err(DatabaseError::Query("disk full".into()))
        }
        async fn get_registration(
            &self,
            _identity: ExternalIdentity,
        ) -> Result<Option<StoredRegistration>, DatabaseError> {
            Ok(None)
        }
        async fn list_registrations(&self) -> Result<Vec<StoredRegistration>, DatabaseError> {
            Ok(Vec::new())
        }
        async fn registration_stats(&self) -> Result<RegistrationStats, DatabaseError> {
            Ok(RegistrationStats::default())
        }
        async fn purge_registrations(&self) -> Result<usize, DatabaseError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn primary_failure_skips_mirror() {
        let sheet = Arc::new(MemorySheet::with_header());
        let reconciler = Reconciler::new(Arc::new(FailingStore), Some(sheet.clone()), TIMEOUT);

        let err = reconciler.upsert(&record(9, Package::Full)).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Query(_)));
        assert_eq!(sheet.rows().await.len(), 1);
    }
}
