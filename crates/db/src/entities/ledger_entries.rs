//! `SeaORM` Entity for ledger_entries table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Assigned by the database on insert.
    pub sequence: i64,
    pub reference: String,
    pub label: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    pub debit_holder_id: Uuid,
    pub credit_holder_id: Uuid,
    pub movement_type: String,
    pub payment_method: String,
    pub scope: String,
    pub reversal_of: Option<String>,
    pub correlation: Option<String>,
    pub dimension: Option<String>,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub posted_at: DateTimeWithTimeZone,
    pub accounting_period: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::balance_holders::Entity",
        from = "Column::DebitHolderId",
        to = "super::balance_holders::Column::Id"
    )]
    DebitHolder,
    #[sea_orm(
        belongs_to = "super::balance_holders::Entity",
        from = "Column::CreditHolderId",
        to = "super::balance_holders::Column::Id"
    )]
    CreditHolder,
}

impl ActiveModelBehavior for ActiveModel {}
