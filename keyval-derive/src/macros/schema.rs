//! Derive macro for `Schema` trait
//!
//! Generates the static field-to-attribute table consulted when resolving
//! field descriptors.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::{parse_macro_input, DeriveInput};

use crate::{attributes, utils};

pub fn derive_schema(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let fields = utils::named_fields(input, "Schema")?;

    let mut entries = Vec::with_capacity(fields.len());
    for field in fields {
        let name = field
            .ident
            .as_ref()
            .map(|ident| ident.unraw().to_string())
            .unwrap_or_default();

        // explicit alias wins over serde rename
        let attribute = match attributes::extract_attribute(field)? {
            Some(attribute) => attribute,
            None => attributes::extract_serde_rename(field)?.unwrap_or_default(),
        };

        entries.push(quote! { ::keyval::Field::new(#name, #attribute) });
    }

    Ok(quote! {
        impl #impl_generics ::keyval::Schema for #struct_name #ty_generics #where_clause {
            fn fields() -> &'static [::keyval::Field] {
                const FIELDS: &[::keyval::Field] = &[#(#entries),*];
                FIELDS
            }
        }
    })
}
