//! Audit trail.
//!
//! Audit records are written in the same unit of work as the change they
//! describe, so the trail never shows a change that was rolled back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use autoledger_shared::types::AuditRecordId;

use crate::ledger::error::LedgerError;

/// What happened to the audited record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// Record inserted.
    Create,
    /// Record changed.
    Update,
}

impl AuditAction {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
        }
    }

    /// Parses an action.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREATE" => Some(Self::Create),
            "UPDATE" => Some(Self::Update),
            _ => None,
        }
    }
}

/// One audit trail entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique identifier.
    pub id: AuditRecordId,
    /// Kind of record (`ledger_entry`, `credit_obligation`, ...).
    pub record_type: String,
    /// Identifier of the audited record.
    pub record_id: String,
    /// What happened.
    pub action: AuditAction,
    /// JSON snapshot of the record after the change.
    pub snapshot: serde_json::Value,
    /// When the change was made.
    pub recorded_at: DateTime<Utc>,
}

impl AuditRecord {
    /// Snapshots `record` as an audit entry.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the record cannot be serialized.
    pub fn capture<T: Serialize>(
        record_type: &str,
        record_id: impl ToString,
        action: AuditAction,
        record: &T,
        now: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        let snapshot = serde_json::to_value(record)
            .map_err(|e| LedgerError::Internal(format!("audit snapshot failed: {e}")))?;
        Ok(Self {
            id: AuditRecordId::new(),
            record_type: record_type.to_string(),
            record_id: record_id.to_string(),
            action,
            snapshot,
            recorded_at: now,
        })
    }
}
