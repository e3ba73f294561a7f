use crate::constraint::expression::{placeholder_name, AttributeNames};
use crate::schema::Schema;

/// Projection expression over the key attributes and every schema attribute
///
/// Empty when any schema field has no storage mapping: the store cannot be
/// asked for an attribute nobody named, so the whole item is fetched instead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    pub expression: Option<String>,
    pub names: AttributeNames,
}

impl Projection {
    pub fn of<T: Schema>(keys: &[&str]) -> Self {
        let fields = T::fields();
        if fields.is_empty() || fields.iter().any(|f| f.attribute.is_empty()) {
            return Self::default();
        }

        let mut names = AttributeNames::new();
        let mut placeholders = Vec::new();

        let attributes = keys.iter().copied().chain(fields.iter().map(|f| f.attribute));
        for attribute in attributes.filter(|a| !a.is_empty()) {
            let name = placeholder_name(attribute);
            if names.insert(name.clone(), attribute.to_string()).is_none() {
                placeholders.push(name);
            }
        }

        Self {
            expression: Some(placeholders.join(", ")),
            names,
        }
    }
}
