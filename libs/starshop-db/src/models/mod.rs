pub mod account;
pub mod order;

pub use account::{Account, Challenge, InsertOutcome, NewAccount};
pub use order::{Completion, NewOrder, Order};
