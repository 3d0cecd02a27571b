//! `SeaORM` Entity for balance_holders table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "balance_holders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub owner_reference: String,
    pub name: String,
    pub kind: String,
    pub scope_group: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub minimum_balance: Option<Decimal>,
    pub is_service: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::charge_splits::Entity")]
    ChargeSplits,
    #[sea_orm(has_many = "super::job_line_items::Entity")]
    JobLineItems,
}

impl Related<super::charge_splits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargeSplits.def()
    }
}

impl Related<super::job_line_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JobLineItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
