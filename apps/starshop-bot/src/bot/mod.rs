pub mod callback_data;
pub mod challenge;
pub mod event;
pub mod gates;
pub mod handlers;
pub mod keyboards;
pub mod state_machine;
pub mod texts;

pub use handlers::Dispatcher;
