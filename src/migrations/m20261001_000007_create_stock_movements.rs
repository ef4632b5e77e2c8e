//! Migration: Create stock_movements table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StockMovements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StockMovements::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(StockMovements::MaterialId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockMovements::MaterialKind)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockMovements::Delta).integer().not_null())
                    .col(
                        ColumnDef::new(StockMovements::ResultingQuantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockMovements::MovementType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockMovements::Reason).string().null())
                    .col(ColumnDef::new(StockMovements::RequestId).big_integer().null())
                    .col(ColumnDef::new(StockMovements::UserId).big_integer().null())
                    .col(
                        ColumnDef::new(StockMovements::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_stock_movements_material")
                    .table(StockMovements::Table)
                    .col(StockMovements::MaterialKind)
                    .col(StockMovements::MaterialId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_stock_movements_created_at")
                    .table(StockMovements::Table)
                    .col(StockMovements::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(StockMovements::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
#[iden = "stock_movements"]
enum StockMovements {
    Table,
    Id,
    #[iden = "material_id"]
    MaterialId,
    #[iden = "material_kind"]
    MaterialKind,
    Delta,
    #[iden = "resulting_quantity"]
    ResultingQuantity,
    #[iden = "movement_type"]
    MovementType,
    Reason,
    #[iden = "request_id"]
    RequestId,
    #[iden = "user_id"]
    UserId,
    #[iden = "created_at"]
    CreatedAt,
}
