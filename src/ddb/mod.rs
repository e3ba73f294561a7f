//! Table backend.
//!
//! [`Ddb`] implements [`KeyVal`](crate::KeyVal) on top of any [`DynamoDb`]
//! transport. Records are JSON objects; conditions, projections and updates use
//! the `#__attr__` / `:__attr__` placeholder scheme of
//! [`expression`](crate::constraint::expression).

mod schema;
mod seq;
mod storage;

pub use schema::Projection;
pub use seq::QuerySource;
pub use storage::Ddb;

use crate::codec::Item;
use crate::constraint::expression::{AttributeNames, AttributeValues};
use crate::context::Context;
use crate::transport::TransportError;

/// Table API used by the backend
///
/// Implementations must return [`TransportError::condition_failed`] when a
/// request's condition expression does not hold.
pub trait DynamoDb {
    /// Fetch one item, `None` when absent
    fn get_item(&self, ctx: &Context, req: GetItem) -> Result<Option<Item>, TransportError>;

    fn put_item(&self, ctx: &Context, req: PutItem) -> Result<(), TransportError>;

    fn delete_item(&self, ctx: &Context, req: DeleteItem) -> Result<(), TransportError>;

    /// Apply an update and return all attributes of the new version
    fn update_item(&self, ctx: &Context, req: UpdateItem) -> Result<Item, TransportError>;

    fn query(&self, ctx: &Context, req: &Query) -> Result<QueryPage, TransportError>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetItem {
    pub table: String,
    pub key: Item,
    pub projection: Option<String>,
    pub names: AttributeNames,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PutItem {
    pub table: String,
    pub item: Item,
    pub condition: Option<String>,
    pub names: AttributeNames,
    pub values: AttributeValues,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteItem {
    pub table: String,
    pub key: Item,
    pub condition: Option<String>,
    pub names: AttributeNames,
    pub values: AttributeValues,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateItem {
    pub table: String,
    pub key: Item,
    /// `SET #__a__=:__a__,...`
    pub update: String,
    pub condition: Option<String>,
    pub names: AttributeNames,
    pub values: AttributeValues,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub index: Option<String>,
    pub key_condition: String,
    pub projection: Option<String>,
    pub names: AttributeNames,
    pub values: AttributeValues,
    pub limit: Option<usize>,
    pub exclusive_start_key: Option<Item>,
    /// Ascending sort key order when `true`
    pub scan_forward: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPage {
    pub items: Vec<Item>,
    /// Key of the last evaluated item, `None` on the final page
    pub last_evaluated_key: Option<Item>,
}
