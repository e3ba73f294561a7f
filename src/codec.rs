//! Entity codec.
//!
//! Entities travel as JSON objects ([`Item`]). The codec knows which attributes
//! hold the hash and sort keys and keeps them in sync with the entity's
//! [`Thing`] implementation when encoding.

use crate::config::{DEFAULT_HASH_ATTRIBUTE, DEFAULT_SORT_ATTRIBUTE};
use crate::error::{Error, Result};
use crate::thing::{Key, Thing};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::marker::PhantomData;

/// Raw record: attribute name → attribute value
pub type Item = Map<String, Value>;

/// Encoder/decoder of entity `T`
pub struct Codec<T> {
    hash_attribute: String,
    sort_attribute: String,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Codec<T> {
    pub fn new(hash_attribute: impl Into<String>, sort_attribute: impl Into<String>) -> Self {
        Self {
            hash_attribute: hash_attribute.into(),
            sort_attribute: sort_attribute.into(),
            _entity: PhantomData,
        }
    }

    pub fn hash_attribute(&self) -> &str {
        &self.hash_attribute
    }

    pub fn sort_attribute(&self) -> &str {
        &self.sort_attribute
    }

    /// `true` for the attributes holding the key
    pub fn is_key_attribute(&self, attribute: &str) -> bool {
        attribute == self.hash_attribute || attribute == self.sort_attribute
    }

    /// Partial record holding only the key attributes
    ///
    /// An empty sort key is omitted; an empty hash key is rejected.
    pub fn encode_key<K: Thing + ?Sized>(&self, key: &K) -> Result<Item> {
        if key.hash_key().is_empty() {
            return Err(Error::InvalidKey("hash key is empty".to_string()));
        }

        let mut item = Item::new();
        item.insert(self.hash_attribute.clone(), Value::String(key.hash_key().to_string()));
        if !key.sort_key().is_empty() {
            item.insert(self.sort_attribute.clone(), Value::String(key.sort_key().to_string()));
        }
        Ok(item)
    }

    /// Copy of `item` restricted to the key attributes
    pub fn key_only(&self, item: &Item) -> Item {
        item.iter()
            .filter(|(k, _)| self.is_key_attribute(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Key carried by a record; missing or non-string attributes read as empty
    pub fn key_of(&self, item: &Item) -> Key {
        let read = |attribute: &str| {
            item.get(attribute)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Key::new(read(&self.hash_attribute), read(&self.sort_attribute))
    }
}

impl<T: Serialize + Thing> Codec<T> {
    /// Encode an entity into a record
    pub fn encode(&self, entity: &T) -> Result<Item> {
        let value = serde_json::to_value(entity).map_err(|e| Error::InvalidEntity(e.to_string()))?;
        let mut item = match value {
            Value::Object(item) => item,
            other => {
                return Err(Error::InvalidEntity(format!(
                    "entity must encode to an object, got {}",
                    kind_of(&other)
                )))
            }
        };

        item.extend(self.encode_key(entity)?);
        Ok(item)
    }
}

impl<T: DeserializeOwned> Codec<T> {
    /// Decode a record into an entity
    pub fn decode(&self, item: Item) -> Result<T> {
        serde_json::from_value(Value::Object(item)).map_err(|e| Error::InvalidEntity(e.to_string()))
    }
}

impl<T> Default for Codec<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_ATTRIBUTE, DEFAULT_SORT_ATTRIBUTE)
    }
}

impl<T> Clone for Codec<T> {
    fn clone(&self) -> Self {
        Self::new(self.hash_attribute.clone(), self.sort_attribute.clone())
    }
}

impl<T> fmt::Debug for Codec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("hash_attribute", &self.hash_attribute)
            .field("sort_attribute", &self.sort_attribute)
            .finish()
    }
}

/// Overlay the non-null attributes of `patch` onto `base`
pub fn merge(mut base: Item, patch: Item) -> Item {
    for (k, v) in patch {
        if !v.is_null() {
            base.insert(k, v);
        }
    }
    base
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
