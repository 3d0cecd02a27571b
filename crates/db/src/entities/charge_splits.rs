//! `SeaORM` Entity for charge_splits table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "charge_splits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tariff_id: Uuid,
    pub position: i32,
    #[sea_orm(column_type = "Decimal(Some((7, 4)))")]
    pub percentage: Decimal,
    pub destination_holder_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tariffs::Entity",
        from = "Column::TariffId",
        to = "super::tariffs::Column::Id"
    )]
    Tariffs,
    #[sea_orm(
        belongs_to = "super::balance_holders::Entity",
        from = "Column::DestinationHolderId",
        to = "super::balance_holders::Column::Id"
    )]
    BalanceHolders,
}

impl Related<super::tariffs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tariffs.def()
    }
}

impl Related<super::balance_holders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BalanceHolders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
