pub mod related;
pub mod schema;
pub mod submissions;

// Re-export handler functions for use in routing
pub use related::related_data;
pub use schema::{create, delete, get, list, public, update};
pub use submissions::list_for_form;
