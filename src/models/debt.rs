use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::material::MaterialKind;

/// Outstanding obligation to return a delivered item
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "debts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub request_id: i64,
    pub request_item_id: i64,
    pub user_id: i64,
    pub material_id: i64,
    pub material_kind: MaterialKind,
    pub original_quantity: i32,
    pub outstanding_quantity: i32,
    pub delivered_at: DateTimeUtc,
    pub settled_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::request::Entity",
        from = "Column::RequestId",
        to = "super::request::Column::Id"
    )]
    Request,
}

impl Related<super::request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Request.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
