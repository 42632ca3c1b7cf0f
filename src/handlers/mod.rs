pub mod health;
pub mod reload;
pub mod search;

pub use health::{health_handler, ready_handler};
pub use reload::reload_handler;
pub use search::{methods_handler, search_handler};
