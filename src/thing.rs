//! Entity key contract.
//!
//! Every value stored through this crate is a [`Thing`]: it exposes a partition
//! (hash) identifier and an optional clustering (sort) identifier. The pair
//! decides where the entity lives and which `query` calls can reach it.
//!
//! # Example
//!
//! ```
//! use keyval::{Key, Thing};
//!
//! #[derive(keyval::Thing)]
//! struct Person {
//!     #[hash_key]
//!     org: String,
//!     #[sort_key]
//!     id: String,
//! }
//!
//! let p = Person { org: "acme".into(), id: "42".into() };
//! assert_eq!(Key::of(&p).to_string(), "acme/42");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trait for values addressable by a (hash, sort) key pair
///
/// An empty sort key means the entity has no clustering component.
pub trait Thing {
    /// Partition identifier
    fn hash_key(&self) -> &str;

    /// Clustering identifier, empty when absent
    fn sort_key(&self) -> &str;
}

/// Owned key pair
///
/// `Key` is the Thing-shaped marker handed out by [`Seq::cursor`](crate::Seq::cursor)
/// and carried by errors that need to name an entity. It serializes, so a cursor
/// can be persisted and fed back through [`Seq::continue_from`](crate::Seq::continue_from)
/// after a restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key {
    pub hash_key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sort_key: String,
}

impl Key {
    pub fn new(hash_key: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self {
            hash_key: hash_key.into(),
            sort_key: sort_key.into(),
        }
    }

    /// Key with only the hash component populated
    pub fn hash(hash_key: impl Into<String>) -> Self {
        Self::new(hash_key, String::new())
    }

    /// Copy the key of any entity
    pub fn of<T: Thing + ?Sized>(thing: &T) -> Self {
        Self::new(thing.hash_key(), thing.sort_key())
    }

    /// `true` when neither component is set
    pub fn is_empty(&self) -> bool {
        self.hash_key.is_empty() && self.sort_key.is_empty()
    }
}

impl Thing for Key {
    fn hash_key(&self) -> &str {
        &self.hash_key
    }

    fn sort_key(&self) -> &str {
        &self.sort_key
    }
}

impl<T: Thing + ?Sized> Thing for &T {
    fn hash_key(&self) -> &str {
        (**self).hash_key()
    }

    fn sort_key(&self) -> &str {
        (**self).sort_key()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sort_key.is_empty() {
            write!(f, "{}", self.hash_key)
        } else {
            write!(f, "{}/{}", self.hash_key, self.sort_key)
        }
    }
}
