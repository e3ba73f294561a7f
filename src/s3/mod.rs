//! Object backend.
//!
//! [`S3`] stores each entity as a JSON object at path `hash` or `hash/sort`
//! through any [`ObjectStore`] transport. Listing returns paths only, so the
//! lazy sequence fetches each object when its element is materialized.
//! Object stores have no conditional writes: constraint lists are ignored.

mod seq;
mod storage;

pub use seq::ListSource;
pub use storage::S3;

use crate::context::Context;
use crate::transport::TransportError;

/// Object API used by the backend
pub trait ObjectStore {
    /// Object body, `None` when absent
    fn get_object(&self, ctx: &Context, req: GetObject) -> Result<Option<Vec<u8>>, TransportError>;

    fn put_object(&self, ctx: &Context, req: PutObject) -> Result<(), TransportError>;

    fn delete_object(&self, ctx: &Context, req: DeleteObject) -> Result<(), TransportError>;

    /// List object paths in lexicographic order
    fn list_objects(&self, ctx: &Context, req: &ListObjects) -> Result<ListPage, TransportError>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetObject {
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PutObject {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteObject {
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListObjects {
    pub bucket: String,
    pub prefix: String,
    /// List paths strictly after this one
    pub start_after: Option<String>,
    pub max_keys: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListPage {
    pub keys: Vec<String>,
    /// More paths follow the last listed one
    pub is_truncated: bool,
}
