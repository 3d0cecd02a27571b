//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a `HolderId` where a `LedgerEntryId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(HolderId, "Unique identifier for a balance holder (financial or item account).");
typed_id!(LedgerEntryId, "Unique identifier for a monetary ledger entry.");
typed_id!(StockEntryId, "Unique identifier for a stock ledger entry.");
typed_id!(TariffId, "Unique identifier for a tariff.");
typed_id!(ChargeId, "Unique identifier for a charge tier.");
typed_id!(ChargeSplitId, "Unique identifier for a charge split.");
typed_id!(ObligationId, "Unique identifier for a credit obligation.");
typed_id!(JobId, "Unique identifier for a workshop job.");
typed_id!(JobLineId, "Unique identifier for a job line item.");
typed_id!(PendingTransactionId, "Unique identifier for a deferred transaction.");
typed_id!(AuditRecordId, "Unique identifier for an audit record.");

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
