use super::{Ddb, DynamoDb, Query};
use crate::codec::Item;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::seq::{Page, PageSource};
use crate::thing::{Key, Thing};
use crate::transport::instrument;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Pages of a table query; every page carries full items
pub struct QuerySource<'a, T, C> {
    db: &'a Ddb<T, C>,
    query: Query,
}

impl<'a, T, C> QuerySource<'a, T, C> {
    pub(crate) fn new(db: &'a Ddb<T, C>, query: Query) -> Self {
        Self { db, query }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }
}

impl<'a, T, C> PageSource for QuerySource<'a, T, C>
where
    T: Thing + Serialize + DeserializeOwned,
    C: DynamoDb,
{
    type Item = T;
    type Raw = Item;

    fn fetch(&mut self, ctx: &Context, after: Option<&Key>, limit: Option<usize>) -> Result<Page<Item>> {
        self.query.exclusive_start_key = after.map(|k| self.db.codec().encode_key(k)).transpose()?;
        self.query.limit = limit;

        let page = instrument("query", &self.query.table, || self.db.client().query(ctx, &self.query))
            .map_err(Error::service_io)?;

        let next = page
            .last_evaluated_key
            .map(|k| self.db.codec().key_of(&k));
        Ok(Page::new(page.items, next))
    }

    fn materialize(&self, _ctx: &Context, raw: &Item) -> Result<T> {
        self.db.codec().decode(raw.clone())
    }

    fn position(&self, raw: &Item) -> Key {
        self.db.codec().key_of(raw)
    }

    fn reverse(&mut self) -> bool {
        self.query.scan_forward = false;
        true
    }
}
