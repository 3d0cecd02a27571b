//! `SeaORM` Entity for charges table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "charges")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tariff_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub min_value: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub max_value: Decimal,
    pub charge_type: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tariffs::Entity",
        from = "Column::TariffId",
        to = "super::tariffs::Column::Id"
    )]
    Tariffs,
}

impl Related<super::tariffs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tariffs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
