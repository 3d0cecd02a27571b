//! Balance holders.
//!
//! A holder is an addressable store of value (financial account) or stock
//! (item account). It never stores a balance; see [`super::balance`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use autoledger_shared::types::HolderId;

use super::error::LedgerError;

/// What kind of owner a holder belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HolderKind {
    /// The workshop business itself.
    Entity,
    /// A supplier.
    Vendor,
    /// A customer.
    Customer,
    /// Internal control account (escrow, credit, expenses, fee sinks).
    Commission,
    /// An inventory item; balances are quantities.
    Item,
}

impl HolderKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Entity => "entity",
            Self::Vendor => "vendor",
            Self::Customer => "customer",
            Self::Commission => "commission",
            Self::Item => "item",
        }
    }

    /// Parses a kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "entity" => Some(Self::Entity),
            "vendor" => Some(Self::Vendor),
            "customer" => Some(Self::Customer),
            "commission" => Some(Self::Commission),
            "item" => Some(Self::Item),
            _ => None,
        }
    }
}

/// An account owned by an entity, vendor, customer, control function or item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceHolder {
    /// Unique identifier.
    pub id: HolderId,
    /// Reference of the owning record (unique).
    pub owner_reference: String,
    /// Display name used in messages.
    pub name: String,
    /// Kind of owner.
    pub kind: HolderKind,
    /// Grouping used for reporting.
    pub scope_group: Option<String>,
    /// Floor a monetary debit may not cross.
    pub minimum_balance: Option<Decimal>,
    /// Service items (labour) carry no stock floor.
    pub is_service: bool,
    /// When the holder was opened.
    pub created_at: DateTime<Utc>,
}

impl BalanceHolder {
    /// Returns true if this holder tracks quantities rather than money.
    #[must_use]
    pub fn is_item(&self) -> bool {
        self.kind == HolderKind::Item
    }

    /// Returns true if a debit leaving `balance_after` on this holder is allowed.
    #[must_use]
    pub fn allows_balance(&self, balance_after: Decimal) -> bool {
        self.minimum_balance
            .is_none_or(|minimum| balance_after >= minimum)
    }

    /// Returns true if on-hand quantity may not go below zero.
    #[must_use]
    pub fn enforces_stock_floor(&self) -> bool {
        self.is_item() && !self.is_service
    }
}

/// Input for opening a holder.
#[derive(Debug, Clone)]
pub struct NewHolder {
    /// Reference of the owning record.
    pub owner_reference: String,
    /// Display name.
    pub name: String,
    /// Kind of owner.
    pub kind: HolderKind,
    /// Reporting group.
    pub scope_group: Option<String>,
    /// Optional monetary floor.
    pub minimum_balance: Option<Decimal>,
    /// Marks an item as a service.
    pub is_service: bool,
}

impl NewHolder {
    /// Creates input for a holder with no floor.
    #[must_use]
    pub fn new(owner_reference: impl Into<String>, name: impl Into<String>, kind: HolderKind) -> Self {
        Self {
            owner_reference: owner_reference.into(),
            name: name.into(),
            kind,
            scope_group: None,
            minimum_balance: None,
            is_service: false,
        }
    }

    /// Sets the monetary floor.
    #[must_use]
    pub fn with_minimum_balance(mut self, minimum: Decimal) -> Self {
        self.minimum_balance = Some(minimum);
        self
    }

    /// Sets the reporting group.
    #[must_use]
    pub fn with_scope_group(mut self, group: impl Into<String>) -> Self {
        self.scope_group = Some(group.into());
        self
    }

    /// Marks the item as a service.
    #[must_use]
    pub fn service(mut self) -> Self {
        self.is_service = true;
        self
    }

    /// Validates the input and builds the holder.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHolder` for an empty owner reference, a floor on an item,
    /// or a service flag on a monetary holder.
    pub fn into_holder(self, now: DateTime<Utc>) -> Result<BalanceHolder, LedgerError> {
        if self.owner_reference.trim().is_empty() {
            return Err(LedgerError::InvalidHolder(
                "owner reference is required".to_string(),
            ));
        }
        if self.kind == HolderKind::Item && self.minimum_balance.is_some() {
            return Err(LedgerError::InvalidHolder(
                "minimum balance applies to monetary holders only".to_string(),
            ));
        }
        if self.kind != HolderKind::Item && self.is_service {
            return Err(LedgerError::InvalidHolder(
                "only items can be services".to_string(),
            ));
        }

        Ok(BalanceHolder {
            id: HolderId::new(),
            owner_reference: self.owner_reference,
            name: self.name,
            kind: self.kind,
            scope_group: self.scope_group,
            minimum_balance: self.minimum_balance,
            is_service: self.is_service,
            created_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_floor_is_inclusive() {
        let holder = NewHolder::new("cash", "Cash", HolderKind::Commission)
            .with_minimum_balance(dec!(0))
            .into_holder(Utc::now())
            .unwrap();

        assert!(holder.allows_balance(dec!(0)));
        assert!(!holder.allows_balance(dec!(-0.01)));
    }

    #[test]
    fn test_no_floor_allows_anything() {
        let holder = NewHolder::new("cust-1", "Jane", HolderKind::Customer)
            .into_holder(Utc::now())
            .unwrap();
        assert!(holder.allows_balance(dec!(-1000000)));
    }

    #[test]
    fn test_service_items_skip_stock_floor() {
        let labour = NewHolder::new("labour", "Labour", HolderKind::Item)
            .service()
            .into_holder(Utc::now())
            .unwrap();
        let filter = NewHolder::new("oil-filter", "Oil filter", HolderKind::Item)
            .into_holder(Utc::now())
            .unwrap();

        assert!(!labour.enforces_stock_floor());
        assert!(filter.enforces_stock_floor());
    }

    #[test]
    fn test_invalid_holders_rejected() {
        assert!(matches!(
            NewHolder::new(" ", "Blank", HolderKind::Entity).into_holder(Utc::now()),
            Err(LedgerError::InvalidHolder(_))
        ));
        assert!(matches!(
            NewHolder::new("bolt", "Bolt", HolderKind::Item)
                .with_minimum_balance(dec!(0))
                .into_holder(Utc::now()),
            Err(LedgerError::InvalidHolder(_))
        ));
        assert!(matches!(
            NewHolder::new("cash", "Cash", HolderKind::Commission)
                .service()
                .into_holder(Utc::now()),
            Err(LedgerError::InvalidHolder(_))
        ));
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(HolderKind::parse("ITEM"), Some(HolderKind::Item));
        assert_eq!(HolderKind::parse("supplier"), None);
    }
}
