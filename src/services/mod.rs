pub mod audit;
pub mod catalog;
pub mod debts;
pub mod inventory;
pub mod requests;
pub mod scheduler;
pub mod stock;
pub mod users;

pub use audit::AuditService;
pub use users::hash_password;
