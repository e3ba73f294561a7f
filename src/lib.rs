//! # Keyval
//!
//! Typed key/value access to remote stores: conditional writes built from
//! field descriptors, and lazy, cursor-resumable query sequences.
//!
//! Two backends ship with the crate, each over a transport trait supplied by
//! the caller:
//!
//! - [`ddb::Ddb`] for tables (items carry full entities, conditional writes)
//! - [`s3::S3`] for buckets (listing returns paths, objects fetched lazily)
//!
//! ```no_run
//! use keyval::{schema, Context, KeyVal, WILDCARD};
//!
//! #[derive(serde::Serialize, serde::Deserialize, keyval::Thing, keyval::Schema)]
//! struct Person {
//!     #[hash_key]
//!     prefix: String,
//!     #[sort_key]
//!     suffix: String,
//!     #[attribute = "name"]
//!     name: String,
//!     #[attribute = "age"]
//!     age: i64,
//! }
//!
//! # fn run<D: KeyVal<Person>>(db: D) -> keyval::Result<()> {
//! let ctx = Context::background();
//! let (_name, age) = schema!(Person => name: String, age: i64);
//!
//! let joe = Person { prefix: "org".into(), suffix: "joe".into(), name: "Joe".into(), age: 42 };
//! db.put(&ctx, &joe, &[age.lt(50)])?;
//!
//! let pattern = Person { prefix: "org".into(), suffix: WILDCARD.into(), name: String::new(), age: 0 };
//! for person in db.query(&ctx, &pattern).limit(10) {
//!     println!("{}", person?.name);
//! }
//! # Ok(())
//! # }
//! ```

extern crate self as keyval;

pub mod codec;
pub mod config;
pub mod constraint;
pub mod context;
pub mod ddb;
pub mod error;
pub mod kv;
pub mod metrics;
pub mod s3;
pub mod schema;
pub mod seq;
pub mod thing;
pub mod transport;

pub use codec::{merge, Codec, Item};
pub use config::{Endpoint, StoreConfig};
pub use constraint::{render, ConditionExpression, Constraint, Op, Violation};
pub use context::Context;
pub use error::{Error, Result};
pub use kv::{KeyVal, WILDCARD};
pub use schema::{attribute_of, resolve, Field, FieldDescriptor, Schema, TypeOf};
pub use seq::{Page, PageSource, Seq, SeqState};
pub use thing::{Key, Thing};
pub use transport::{TransportError, TransportErrorKind};

pub use keyval_derive::{Schema, Thing};
