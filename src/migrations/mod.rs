pub use sea_orm_migration::prelude::*;

mod m20261001_000001_create_groups;
mod m20261001_000002_create_users;
mod m20261001_000003_create_warehouse_permissions;
mod m20261001_000004_create_materials;
mod m20261001_000005_create_requests;
mod m20261001_000006_create_debts;
mod m20261001_000007_create_stock_movements;
mod m20261001_000008_create_audit_logs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_create_groups::Migration),
            Box::new(m20261001_000002_create_users::Migration),
            Box::new(m20261001_000003_create_warehouse_permissions::Migration),
            Box::new(m20261001_000004_create_materials::Migration),
            Box::new(m20261001_000005_create_requests::Migration),
            Box::new(m20261001_000006_create_debts::Migration),
            Box::new(m20261001_000007_create_stock_movements::Migration),
            Box::new(m20261001_000008_create_audit_logs::Migration),
        ]
    }
}
