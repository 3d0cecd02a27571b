//! Ledger error types.
//!
//! Every core operation fails with a [`LedgerError`]. Validation and
//! business-rule errors are raised before anything is written; persistence
//! errors abort the whole unit of work.

use rust_decimal::Decimal;
use thiserror::Error;
use autoledger_shared::{AppError, ErrorClass};

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Posting reference is blank.
    #[error("Posting reference is required")]
    EmptyReference,

    /// Movement type or stock category is not recognised.
    #[error("Unknown movement type: {0}")]
    UnknownMovementType(String),

    /// A holder owner reference does not resolve.
    #[error("Balance holder not found: {0}")]
    HolderNotFound(String),

    /// A holder was addressed with the wrong ledger (money vs stock).
    #[error("Balance holder {0} cannot take this kind of posting")]
    InvalidHolder(String),

    /// Debit and credit resolve to the same holder.
    #[error("Debit and credit holder must differ: {0}")]
    SameHolder(String),

    /// Amount must be strictly positive.
    #[error("Amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    /// Quantity must be strictly positive.
    #[error("Quantity must be positive, got {0}")]
    InvalidQuantity(i64),

    /// Reversal names no original.
    #[error("Reversal must name the reference it reverses")]
    ReversalTargetMissing,

    /// `reversal_of` was set on a movement that is not a reversal.
    #[error("Only reversals may reference another posting, got {0}")]
    UnexpectedReversalTarget(String),

    /// The reference being reversed does not exist.
    #[error("Original posting not found: {0}")]
    OriginalNotFound(String),

    /// Tariff does not exist.
    #[error("Tariff not found: {0}")]
    TariffNotFound(String),

    /// Charge tier range is empty or inverted.
    #[error("Invalid charge range [{min}, {max})")]
    InvalidChargeRange {
        /// Lower bound (inclusive).
        min: Decimal,
        /// Upper bound (exclusive).
        max: Decimal,
    },

    /// Charge tier overlaps an existing tier of the same tariff.
    #[error("Charge tier [{min}, {max}) overlaps an existing tier")]
    OverlappingChargeTier {
        /// Lower bound (inclusive).
        min: Decimal,
        /// Upper bound (exclusive).
        max: Decimal,
    },

    /// Split or charge percentage out of range.
    #[error("Percentage must be in (0, 100], got {0}")]
    InvalidPercentage(Decimal),

    /// Obligation does not exist.
    #[error("Credit obligation not found: {0}")]
    ObligationNotFound(String),

    /// Settlement attempted on an obligation not taken on credit.
    #[error("Obligation {0} is not on credit")]
    NotOnCredit(String),

    /// Settlement amount must be strictly positive.
    #[error("Settlement amount must be positive, got {0}")]
    InvalidSettlement(Decimal),

    /// Job completion timestamps are inconsistent.
    #[error("Job {0} cannot complete before it was created")]
    InvalidJobTimes(String),

    /// Obligation on credit names no holder to settle from.
    #[error("Obligation {0} on credit needs a settlement holder")]
    SettlementHolderMissing(String),

    // ========== Conflict Errors ==========
    /// Reference has already been posted.
    #[error("Duplicate reference: {0}")]
    DuplicateReference(String),

    /// Reference has already been reversed.
    #[error("Posting {0} is already reversed")]
    AlreadyReversed(String),

    /// Owner already has a holder.
    #[error("Balance holder already exists for owner {0}")]
    DuplicateHolder(String),

    /// Obligation reference already exists.
    #[error("Credit obligation already exists: {0}")]
    DuplicateObligation(String),

    /// Job already has its labour posted.
    #[error("Job {0} is already completed")]
    JobAlreadyCompleted(String),

    /// A tariff is already registered for the same key.
    #[error("Tariff already exists for {0}")]
    DuplicateTariff(String),

    // ========== Business Rule Errors ==========
    /// Debit would take a holder below its minimum balance.
    #[error("Insufficient funds on {holder}: balance after posting {balance_after} is below minimum {minimum}")]
    InsufficientFunds {
        /// Owner reference of the debited holder.
        holder: String,
        /// Derived balance the posting would leave.
        balance_after: Decimal,
        /// Configured floor.
        minimum: Decimal,
    },

    /// Stock sale would take on-hand quantity negative.
    #[error("Insufficient quantity on {holder}: on hand {on_hand}, requested {requested}")]
    InsufficientQuantity {
        /// Owner reference of the item.
        holder: String,
        /// Current on-hand quantity.
        on_hand: i64,
        /// Quantity requested.
        requested: i64,
    },

    /// Settlement exceeds the remaining balance.
    #[error("Overpayment on {reference}: outstanding {outstanding}, attempted {attempted}")]
    Overpayment {
        /// Obligation reference.
        reference: String,
        /// Remaining balance.
        outstanding: Decimal,
        /// Amount offered.
        attempted: Decimal,
    },

    // ========== Concurrency Errors ==========
    /// Concurrent modification detected.
    #[error("Concurrent modification detected, please retry")]
    ConcurrentModification,

    // ========== Store Errors ==========
    /// Underlying store failure.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Returns the stable error code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyReference => "EMPTY_REFERENCE",
            Self::UnknownMovementType(_) => "UNKNOWN_MOVEMENT_TYPE",
            Self::HolderNotFound(_) => "HOLDER_NOT_FOUND",
            Self::InvalidHolder(_) => "INVALID_HOLDER",
            Self::SameHolder(_) => "SAME_HOLDER",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::InvalidQuantity(_) => "INVALID_QUANTITY",
            Self::ReversalTargetMissing => "REVERSAL_TARGET_MISSING",
            Self::UnexpectedReversalTarget(_) => "UNEXPECTED_REVERSAL_TARGET",
            Self::OriginalNotFound(_) => "ORIGINAL_NOT_FOUND",
            Self::TariffNotFound(_) => "TARIFF_NOT_FOUND",
            Self::InvalidChargeRange { .. } => "INVALID_CHARGE_RANGE",
            Self::OverlappingChargeTier { .. } => "OVERLAPPING_CHARGE_TIER",
            Self::InvalidPercentage(_) => "INVALID_PERCENTAGE",
            Self::ObligationNotFound(_) => "OBLIGATION_NOT_FOUND",
            Self::NotOnCredit(_) => "NOT_ON_CREDIT",
            Self::InvalidSettlement(_) => "INVALID_SETTLEMENT",
            Self::InvalidJobTimes(_) => "INVALID_JOB_TIMES",
            Self::SettlementHolderMissing(_) => "SETTLEMENT_HOLDER_MISSING",
            Self::DuplicateReference(_) => "DUPLICATE_REFERENCE",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
            Self::DuplicateHolder(_) => "DUPLICATE_HOLDER",
            Self::DuplicateObligation(_) => "DUPLICATE_OBLIGATION",
            Self::JobAlreadyCompleted(_) => "JOB_ALREADY_COMPLETED",
            Self::DuplicateTariff(_) => "DUPLICATE_TARIFF",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::InsufficientQuantity { .. } => "INSUFFICIENT_QUANTITY",
            Self::Overpayment { .. } => "OVERPAYMENT",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the boundary classification for this error.
    #[must_use]
    pub fn classification(&self) -> ErrorClass {
        match self {
            Self::EmptyReference
            | Self::UnknownMovementType(_)
            | Self::HolderNotFound(_)
            | Self::InvalidHolder(_)
            | Self::SameHolder(_)
            | Self::InvalidAmount(_)
            | Self::InvalidQuantity(_)
            | Self::ReversalTargetMissing
            | Self::UnexpectedReversalTarget(_)
            | Self::OriginalNotFound(_)
            | Self::TariffNotFound(_)
            | Self::InvalidChargeRange { .. }
            | Self::OverlappingChargeTier { .. }
            | Self::InvalidPercentage(_)
            | Self::ObligationNotFound(_)
            | Self::NotOnCredit(_)
            | Self::InvalidSettlement(_)
            | Self::InvalidJobTimes(_)
            | Self::SettlementHolderMissing(_) => ErrorClass::Validation,

            Self::DuplicateReference(_)
            | Self::AlreadyReversed(_)
            | Self::DuplicateHolder(_)
            | Self::DuplicateObligation(_)
            | Self::JobAlreadyCompleted(_)
            | Self::DuplicateTariff(_)
            | Self::ConcurrentModification => ErrorClass::Conflict,

            Self::InsufficientFunds { .. }
            | Self::InsufficientQuantity { .. }
            | Self::Overpayment { .. } => ErrorClass::BusinessRule,

            Self::Persistence(_) => ErrorClass::Persistence,

            Self::Internal(_) => ErrorClass::Internal,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification)
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError::new(err.classification(), err.to_string())
    }
}
