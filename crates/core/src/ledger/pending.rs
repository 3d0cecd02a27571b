//! Deferred transactions.
//!
//! A deferred transaction is a posting request parked for later replay. It is
//! replayed through exactly the same validation as an immediate posting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use autoledger_shared::types::PendingTransactionId;

use super::types::PostingRequest;

/// Replay state of a deferred transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PendingStatus {
    /// Waiting for replay.
    Pending,
    /// Posted successfully.
    Processed,
    /// Rejected; see `reason`.
    Failed,
}

impl PendingStatus {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processed => "PROCESSED",
            Self::Failed => "FAILED",
        }
    }

    /// Parses a status.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "PROCESSED" => Some(Self::Processed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A queued posting request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingTransaction {
    /// Unique identifier.
    pub id: PendingTransactionId,
    /// The request to replay.
    pub request: PostingRequest,
    /// Replay state.
    pub status: PendingStatus,
    /// Rejection message when failed.
    pub reason: Option<String>,
    /// When it was queued.
    pub created_at: DateTime<Utc>,
    /// When it was replayed.
    pub processed_at: Option<DateTime<Utc>>,
}

impl PendingTransaction {
    /// Queues a request.
    #[must_use]
    pub fn new(request: PostingRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: PendingTransactionId::new(),
            request,
            status: PendingStatus::Pending,
            reason: None,
            created_at: now,
            processed_at: None,
        }
    }

    /// Marks the request as posted.
    pub fn mark_processed(&mut self, now: DateTime<Utc>) {
        self.status = PendingStatus::Processed;
        self.reason = None;
        self.processed_at = Some(now);
    }

    /// Marks the request as rejected.
    pub fn mark_failed(&mut self, reason: impl Into<String>, now: DateTime<Utc>) {
        self.status = PendingStatus::Failed;
        self.reason = Some(reason.into());
        self.processed_at = Some(now);
    }
}

/// Outcome of one replay pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaySummary {
    /// Requests posted.
    pub processed: usize,
    /// Requests rejected.
    pub failed: usize,
}
