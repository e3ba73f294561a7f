//! Derive macro for `Thing` trait

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, DeriveInput, Field};

use crate::{attributes, utils};

pub fn derive_thing(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let fields = utils::named_fields(input, "Thing")?;

    let hash_key = single(fields.iter(), "hash_key")?.ok_or_else(|| {
        syn::Error::new_spanned(&input.ident, "Thing requires a field marked #[hash_key]")
    })?;
    let hash_ident = &hash_key.ident;

    let sort_body = match single(fields.iter(), "sort_key")? {
        Some(field) => {
            let ident = &field.ident;
            quote! { ::core::convert::AsRef::<str>::as_ref(&self.#ident) }
        }
        None => quote! { "" },
    };

    Ok(quote! {
        impl #impl_generics ::keyval::Thing for #struct_name #ty_generics #where_clause {
            fn hash_key(&self) -> &str {
                ::core::convert::AsRef::<str>::as_ref(&self.#hash_ident)
            }

            fn sort_key(&self) -> &str {
                #sort_body
            }
        }
    })
}

/// The only field carrying `marker`, if any
fn single<'a>(fields: impl Iterator<Item = &'a Field>, marker: &str) -> syn::Result<Option<&'a Field>> {
    let mut found: Option<&Field> = None;
    for field in fields.filter(|f| attributes::has_attribute(f, marker)) {
        if found.is_some() {
            return Err(syn::Error::new_spanned(
                field,
                format!("only one field may be marked #[{marker}]"),
            ));
        }
        found = Some(field);
    }
    Ok(found)
}
