//! Migration: Create requests and request_items tables

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Requests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Requests::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Requests::UserId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Requests::RequestedFor)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Requests::Status).string_len(16).not_null())
                    .col(ColumnDef::new(Requests::Reason).text().not_null())
                    .col(ColumnDef::new(Requests::ReviewerId).big_integer().null())
                    .col(ColumnDef::new(Requests::StudentName).string().not_null())
                    .col(ColumnDef::new(Requests::ReviewerName).string().not_null())
                    .col(
                        ColumnDef::new(Requests::Folio)
                            .string_len(16)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Requests::GroupId).big_integer().null())
                    .col(ColumnDef::new(Requests::GroupName).string().null())
                    .col(ColumnDef::new(Requests::DebtAmount).double().null())
                    .col(
                        ColumnDef::new(Requests::StockReserved)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Requests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Requests::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_requests_user_id")
                    .table(Requests::Table)
                    .col(Requests::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_requests_status")
                    .table(Requests::Table)
                    .col(Requests::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RequestItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RequestItems::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RequestItems::RequestId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RequestItems::MaterialId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RequestItems::MaterialKind)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(RequestItems::Quantity).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(RequestItems::Table, RequestItems::RequestId)
                            .to(Requests::Table, Requests::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_request_items_request_id")
                    .table(RequestItems::Table)
                    .col(RequestItems::RequestId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RequestItems::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Requests::Table).if_exists().to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Requests {
    Table,
    Id,
    #[iden = "user_id"]
    UserId,
    #[iden = "requested_for"]
    RequestedFor,
    Status,
    Reason,
    #[iden = "reviewer_id"]
    ReviewerId,
    #[iden = "student_name"]
    StudentName,
    #[iden = "reviewer_name"]
    ReviewerName,
    Folio,
    #[iden = "group_id"]
    GroupId,
    #[iden = "group_name"]
    GroupName,
    #[iden = "debt_amount"]
    DebtAmount,
    #[iden = "stock_reserved"]
    StockReserved,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "updated_at"]
    UpdatedAt,
}

#[derive(Iden)]
#[iden = "request_items"]
pub enum RequestItems {
    Table,
    Id,
    #[iden = "request_id"]
    RequestId,
    #[iden = "material_id"]
    MaterialId,
    #[iden = "material_kind"]
    MaterialKind,
    Quantity,
}
