//! Secondary, human-readable mirror of the registrations table.
//!
//! The mirror is a spreadsheet worksheet addressed by row number. It has no
//! uniqueness guarantee of its own; the reconciler looks the identity up in
//! [`row::IDENTITY_COLUMN`] before deciding between update and append.

pub mod google_sheets;
pub mod memory;
pub mod row;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::MirrorError;

pub use google_sheets::GoogleSheetsMirror;
pub use memory::MemorySheet;

/// A row-addressed worksheet.
#[async_trait]
pub trait MirrorSheet: Send + Sync {
    /// All cell values of `column`, top to bottom, as text. Index 0 is row 1.
    async fn column_values(&self, column: char) -> Result<Vec<String>, MirrorError>;

    /// Overwrite row `row` (1-based) from column A onward.
    async fn update_row(&self, row: usize, values: &[Value]) -> Result<(), MirrorError>;

    /// Append a row after the last non-empty one.
    async fn append_row(&self, values: &[Value]) -> Result<(), MirrorError>;
}
