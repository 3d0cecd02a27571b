//! `SeaORM` Entity for job_line_items table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "job_line_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub job_id: Uuid,
    pub item_holder_id: Uuid,
    pub quantity: i64,
    pub stock_entry_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::balance_holders::Entity",
        from = "Column::ItemHolderId",
        to = "super::balance_holders::Column::Id"
    )]
    BalanceHolders,
    #[sea_orm(
        belongs_to = "super::stock_entries::Entity",
        from = "Column::StockEntryId",
        to = "super::stock_entries::Column::Id"
    )]
    StockEntries,
}

impl Related<super::balance_holders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BalanceHolders.def()
    }
}

impl Related<super::stock_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
