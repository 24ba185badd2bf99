pub mod account_repo;
pub mod order_repo;
