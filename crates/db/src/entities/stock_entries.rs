//! `SeaORM` Entity for stock_entries table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Assigned by the database on insert.
    pub sequence: i64,
    #[sea_orm(unique)]
    pub reference: String,
    pub quantity: i64,
    pub debit_holder_id: Uuid,
    pub credit_holder_id: Uuid,
    pub category: String,
    pub scope: String,
    pub reversal_of: Option<String>,
    pub job_id: Option<Uuid>,
    pub description: Option<String>,
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
    #[sea_orm(has_many = "super::job_line_items::Entity")]
    JobLineItems,
}

impl Related<super::job_line_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JobLineItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
