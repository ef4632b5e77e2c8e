//! Migration: Create warehouse_permissions table

use sea_orm_migration::prelude::*;

use super::m20261001_000002_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WarehousePermissions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WarehousePermissions::UserId)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(WarehousePermissions::ChatAccess)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(WarehousePermissions::StockModify)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(WarehousePermissions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(WarehousePermissions::Table, WarehousePermissions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(WarehousePermissions::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
#[iden = "warehouse_permissions"]
enum WarehousePermissions {
    Table,
    #[iden = "user_id"]
    UserId,
    #[iden = "chat_access"]
    ChatAccess,
    #[iden = "stock_modify"]
    StockModify,
    #[iden = "updated_at"]
    UpdatedAt,
}
