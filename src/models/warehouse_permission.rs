use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Fine-grained flags for warehouse staff, created on first change
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "warehouse_permissions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    pub chat_access: bool,
    pub stock_modify: bool,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Effective flags; a missing record means both are off
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseFlags {
    pub chat_access: bool,
    pub stock_modify: bool,
}

impl From<Option<Model>> for WarehouseFlags {
    fn from(record: Option<Model>) -> Self {
        record
            .map(|r| WarehouseFlags {
                chat_access: r.chat_access,
                stock_modify: r.stock_modify,
            })
            .unwrap_or_default()
    }
}
