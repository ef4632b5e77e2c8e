//! Migration: Create the four material tables
//!
//! Table and quantity column names come from the material-kind resolver.

use sea_orm_migration::prelude::*;

use crate::models::material::MaterialKind;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for kind in MaterialKind::ALL {
            let target = kind.resolve();
            let mut table = Table::create();
            table
                .table(Alias::new(target.table))
                .if_not_exists()
                .col(
                    ColumnDef::new(Alias::new("id"))
                        .big_integer()
                        .not_null()
                        .auto_increment()
                        .primary_key(),
                )
                .col(ColumnDef::new(Alias::new("name")).string().not_null())
                .col(
                    ColumnDef::new(Alias::new(target.quantity_column))
                        .integer()
                        .not_null()
                        .default(0),
                );

            if target.has_hazards {
                table
                    .col(ColumnDef::new(Alias::new("physical_hazards")).string().null())
                    .col(ColumnDef::new(Alias::new("health_hazards")).string().null())
                    .col(
                        ColumnDef::new(Alias::new("environmental_hazards"))
                            .string()
                            .null(),
                    );
            }

            manager.create_table(table.to_owned()).await?;

            manager
                .create_index(
                    Index::create()
                        .name(format!("idx_{}_name", target.table))
                        .table(Alias::new(target.table))
                        .col(Alias::new("name"))
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for kind in MaterialKind::ALL {
            manager
                .drop_table(
                    Table::drop()
                        .table(Alias::new(kind.resolve().table))
                        .if_exists()
                        .to_owned(),
                )
                .await?;
        }
        Ok(())
    }
}
