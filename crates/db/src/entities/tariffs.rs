//! `SeaORM` Entity for tariffs table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "tariffs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub code: String,
    pub movement_type: String,
    pub payment_method: String,
    pub scope: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::charges::Entity")]
    Charges,
    #[sea_orm(has_many = "super::charge_splits::Entity")]
    ChargeSplits,
}

impl Related<super::charges::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Charges.def()
    }
}

impl Related<super::charge_splits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargeSplits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
