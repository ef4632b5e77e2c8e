use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::material::MaterialKind;

/// Append-only ledger of stock changes
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_movements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub material_id: i64,
    pub material_kind: MaterialKind,
    pub delta: i32,
    pub resulting_quantity: i32,
    pub movement_type: String,
    pub reason: Option<String>,
    pub request_id: Option<i64>,
    pub user_id: Option<i64>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// Held at creation of a pending request
    Reserve,
    /// Hold given back on reject/cancel
    Release,
    /// Taken at delivery of a request that held nothing
    Consume,
    /// Loaned material brought back
    Return,
    /// Manual correction by staff
    Adjustment,
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MovementType::Reserve => write!(f, "reserve"),
            MovementType::Release => write!(f, "release"),
            MovementType::Consume => write!(f, "consume"),
            MovementType::Return => write!(f, "return"),
            MovementType::Adjustment => write!(f, "adjustment"),
        }
    }
}
