//! Labour posting on job completion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use autoledger_shared::types::{HolderId, JobId, JobLineId, StockEntryId};

use super::types::{StockCategory, StockRequest};
use crate::ledger::error::LedgerError;

/// Suffix of the stock reference posted for a job's labour.
pub const LABOUR_SUFFIX: &str = "-labour";

/// A job being marked complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobCompletion {
    /// The job.
    pub job_id: JobId,
    /// Business reference of the job card.
    pub job_reference: String,
    /// Owner reference of the entity doing the work.
    pub entity_owner: String,
    /// Entity scope.
    pub scope: String,
    /// When the job was opened.
    pub created_at: DateTime<Utc>,
    /// When the job was completed.
    pub completed_at: DateTime<Utc>,
}

/// A line on a job card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobLineItem {
    /// Unique identifier.
    pub id: JobLineId,
    /// The job.
    pub job_id: JobId,
    /// Item holder consumed.
    pub item_holder: HolderId,
    /// Quantity consumed.
    pub quantity: i64,
    /// Stock posting backing this line.
    pub stock_entry: StockEntryId,
    /// When the line was written.
    pub created_at: DateTime<Utc>,
}

impl JobCompletion {
    /// Hours of labour to bill: whole elapsed hours, at least one for any
    /// non-zero duration. `None` when no time elapsed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidJobTimes` if the job completes before it was opened.
    pub fn labour_quantity(&self) -> Result<Option<i64>, LedgerError> {
        let elapsed = self.completed_at - self.created_at;
        if elapsed < chrono::TimeDelta::zero() {
            return Err(LedgerError::InvalidJobTimes(self.job_reference.clone()));
        }
        if elapsed.is_zero() {
            return Ok(None);
        }
        Ok(Some(elapsed.num_hours().max(1)))
    }

    /// Builds the labour sale: the labour item is debited, the entity credited.
    #[must_use]
    pub fn labour_request(&self, labour_owner: &str, quantity: i64) -> StockRequest {
        let mut request = StockRequest::new(
            format!("{}{LABOUR_SUFFIX}", self.job_reference),
            quantity,
            StockCategory::Sale,
            labour_owner,
            self.entity_owner.as_str(),
        )
        .with_scope(self.scope.as_str())
        .with_description(format!("labour for job {}", self.job_reference));
        request.job_id = Some(self.job_id);
        request
    }
}
