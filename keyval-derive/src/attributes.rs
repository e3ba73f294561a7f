//! Attribute parsing utilities

use syn::{Attribute, ExprLit, Field, Lit, LitStr, Token};

/// Check if field has a specific attribute
pub fn has_attribute(field: &Field, attr_name: &str) -> bool {
    field.attrs.iter().any(|attr| attr.path().is_ident(attr_name))
}

/// Extract the storage alias from `#[attribute = "name,modifiers"]`
///
/// Only the first comma-separated token names the attribute; the rest are
/// modifiers (`omitempty`, ...) meaningful to the wire codec only.
pub fn extract_attribute(field: &Field) -> syn::Result<Option<String>> {
    for attr in &field.attrs {
        if attr.path().is_ident("attribute") {
            let value = name_value_str(attr)?;
            let name = value.split(',').next().unwrap_or_default().trim();
            return Ok(Some(name.to_string()));
        }
    }
    Ok(None)
}

fn name_value_str(attr: &Attribute) -> syn::Result<String> {
    let meta = attr.meta.require_name_value()?;
    match &meta.value {
        syn::Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => Ok(s.value()),
        other => Err(syn::Error::new_spanned(other, "expected a string literal")),
    }
}

/// Extract `rename` from `#[serde(...)]`
///
/// `rename(serialize = "..")` counts as well; every other serde option is
/// skipped.
pub fn extract_serde_rename(field: &Field) -> syn::Result<Option<String>> {
    let mut rename = None;

    for attr in field.attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                if meta.input.peek(Token![=]) {
                    let s: LitStr = meta.value()?.parse()?;
                    rename = Some(s.value());
                } else {
                    meta.parse_nested_meta(|inner| {
                        let s: LitStr = inner.value()?.parse()?;
                        if inner.path.is_ident("serialize") {
                            rename = Some(s.value());
                        }
                        Ok(())
                    })?;
                }
                return Ok(());
            }

            skip(&meta)
        })?;
    }

    Ok(rename)
}

fn skip(meta: &syn::meta::ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        let content;
        syn::parenthesized!(content in meta.input);
        let _: proc_macro2::TokenStream = content.parse()?;
    }
    Ok(())
}
