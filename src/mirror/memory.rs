//! In-process worksheet, used by tests and local runs without a spreadsheet.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::MirrorSheet;
use super::row::{HEADER, cell_text, column_index};
use crate::error::MirrorError;

#[derive(Default)]
pub struct MemorySheet {
    rows: Mutex<Vec<Vec<Value>>>,
    unavailable: AtomicBool,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sheet whose first row is the column header.
    pub fn with_header() -> Self {
        Self {
            rows: Mutex::new(vec![HEADER.iter().map(|h| Value::from(*h)).collect()]),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail with `MirrorError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of all rows as display text.
    pub async fn rows(&self) -> Vec<Vec<String>> {
        self.rows
            .lock()
            .await
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect()
    }

    fn check_available(&self) -> Result<(), MirrorError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(MirrorError::Unavailable("memory sheet offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MirrorSheet for MemorySheet {
    async fn column_values(&self, column: char) -> Result<Vec<String>, MirrorError> {
        self.check_available()?;
        let idx = column_index(column);
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .map(|row| row.get(idx).map(cell_text).unwrap_or_default())
            .collect())
    }

    async fn update_row(&self, row: usize, values: &[Value]) -> Result<(), MirrorError> {
        self.check_available()?;
        let mut rows = self.rows.lock().await;
        if row == 0 {
            return Err(MirrorError::InvalidResponse("row numbers start at 1".into()));
        }
        if rows.len() < row {
            rows.resize(row, Vec::new());
        }
        rows[row - 1] = values.to_vec();
        Ok(())
    }

    async fn append_row(&self, values: &[Value]) -> Result<(), MirrorError> {
        self.check_available()?;
        self.rows.lock().await.push(values.to_vec());
        Ok(())
    }
}
