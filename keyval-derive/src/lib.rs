//! Derive macros for keyval
//!
//! This crate provides the `Thing` and `Schema` derives re-exported by `keyval`.

mod attributes;
mod macros;
mod utils;

use proc_macro::TokenStream;

/// Derive macro for `Thing` - implements the entity key contract
///
/// One field must be marked `#[hash_key]`; at most one may be marked
/// `#[sort_key]`. Both must be `AsRef<str>`. Without a sort key field the
/// entity has an empty sort key.
///
/// ```ignore
/// #[derive(Thing)]
/// struct Person {
///     #[hash_key]
///     org: String,
///     #[sort_key]
///     id: String,
/// }
/// ```
#[proc_macro_derive(Thing, attributes(hash_key, sort_key))]
pub fn derive_thing(input: TokenStream) -> TokenStream {
    macros::derive_thing(input)
}

/// Derive macro for `Schema` - generates the field-to-attribute table
///
/// Each field maps to the first comma-separated token of
/// `#[attribute = "name,modifiers"]`, or else to `#[serde(rename = "name")]`,
/// or else to the empty (unmapped) attribute.
#[proc_macro_derive(Schema, attributes(attribute, serde))]
pub fn derive_schema(input: TokenStream) -> TokenStream {
    macros::derive_schema(input)
}
