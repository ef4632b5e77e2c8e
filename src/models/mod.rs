pub mod audit_log;
pub mod debt;
pub mod group;
pub mod material;
pub mod request;
pub mod request_item;
pub mod stock_movement;
pub mod user;
pub mod warehouse_permission;

#[allow(unused_imports)]
pub mod prelude {
    pub use super::audit_log::{self, Entity as AuditLog};
    pub use super::debt::{self, Entity as Debt};
    pub use super::group::{self, Entity as Group};
    pub use super::request::{self, Entity as Request};
    pub use super::request_item::{self, Entity as RequestItem};
    pub use super::stock_movement::{self, Entity as StockMovement};
    pub use super::user::{self, Entity as User};
    pub use super::warehouse_permission::{self, Entity as WarehousePermission};
}
