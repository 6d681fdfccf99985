//! Edit transaction tracking

pub mod state;
pub mod store;

pub use state::{Edit, EditExpiry, EditState, DEFAULT_HANDLE};
pub use store::{sanitize_handle, EditStore};
