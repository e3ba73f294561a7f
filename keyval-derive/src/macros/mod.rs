//! Macro implementations

pub mod schema;
pub mod thing;

pub use schema::derive_schema;
pub use thing::derive_thing;
