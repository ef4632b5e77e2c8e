//! Migration: Create debts table

use sea_orm_migration::prelude::*;

use super::m20261001_000005_create_requests::{RequestItems, Requests};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Debts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Debts::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Debts::RequestId).big_integer().not_null())
                    .col(ColumnDef::new(Debts::RequestItemId).big_integer().not_null())
                    .col(ColumnDef::new(Debts::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Debts::MaterialId).big_integer().not_null())
                    .col(ColumnDef::new(Debts::MaterialKind).string_len(16).not_null())
                    .col(ColumnDef::new(Debts::OriginalQuantity).integer().not_null())
                    .col(
                        ColumnDef::new(Debts::OutstandingQuantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Debts::DeliveredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Debts::SettledAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Debts::Table, Debts::RequestId)
                            .to(Requests::Table, Requests::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Debts::Table, Debts::RequestItemId)
                            .to(RequestItems::Table, RequestItems::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_debts_user_id")
                    .table(Debts::Table)
                    .col(Debts::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_debts_request_id")
                    .table(Debts::Table)
                    .col(Debts::RequestId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Debts::Table).if_exists().to_owned())
            .await
    }
}

#[derive(Iden)]
enum Debts {
    Table,
    Id,
    #[iden = "request_id"]
    RequestId,
    #[iden = "request_item_id"]
    RequestItemId,
    #[iden = "user_id"]
    UserId,
    #[iden = "material_id"]
    MaterialId,
    #[iden = "material_kind"]
    MaterialKind,
    #[iden = "original_quantity"]
    OriginalQuantity,
    #[iden = "outstanding_quantity"]
    OutstandingQuantity,
    #[iden = "delivered_at"]
    DeliveredAt,
    #[iden = "settled_at"]
    SettledAt,
}
