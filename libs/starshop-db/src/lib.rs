pub mod db;
pub mod error;
pub mod memory;
pub mod models;
pub mod repositories;

pub use db::{Schema, init_db, migrate};
pub use error::{StoreError, StoreResult};
pub use memory::{MemoryAccountStore, MemoryOrderStore};
pub use repositories::account_repo::{AccountRepository, AccountStore};
pub use repositories::order_repo::{OrderRepository, OrderStore};
pub use sqlx;
