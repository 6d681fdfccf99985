//! CLI command implementations

pub mod config;
pub mod edit;
pub mod gc;
pub mod hash;
pub mod lock;

pub use config::execute as config;
pub use edit::execute as edit;
pub use gc::execute as gc;
pub use hash::execute as hash;
pub use lock::execute as lock;
