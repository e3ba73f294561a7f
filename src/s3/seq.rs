use super::{ListObjects, ObjectStore, S3};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::seq::{Page, PageSource};
use crate::thing::{Key, Thing};
use crate::transport::instrument;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Pages of a bucket listing; elements are object paths
///
/// Positions are [`Key::hash`] of the path, so a cursor resumes listing right
/// after the last reached object.
pub struct ListSource<'a, T, C> {
    db: &'a S3<T, C>,
    list: ListObjects,
}

impl<'a, T, C> ListSource<'a, T, C> {
    pub(crate) fn new(db: &'a S3<T, C>, list: ListObjects) -> Self {
        Self { db, list }
    }

    pub fn list(&self) -> &ListObjects {
        &self.list
    }
}

impl<'a, T, C> PageSource for ListSource<'a, T, C>
where
    T: Thing + Serialize + DeserializeOwned,
    C: ObjectStore,
{
    type Item = T;
    type Raw = String;

    fn fetch(&mut self, ctx: &Context, after: Option<&Key>, limit: Option<usize>) -> Result<Page<String>> {
        self.list.start_after = after.map(ToString::to_string);
        self.list.max_keys = limit;

        let page = instrument("list", &self.list.bucket, || self.db.client().list_objects(ctx, &self.list))
            .map_err(Error::service_io)?;

        let next = if page.is_truncated {
            page.keys.last().map(Key::hash)
        } else {
            None
        };
        Ok(Page::new(page.keys, next))
    }

    fn materialize(&self, ctx: &Context, raw: &String) -> Result<T> {
        self.db.fetch(ctx, raw)?.ok_or_else(|| Error::NotFound { key: Key::hash(raw) })
    }

    fn position(&self, raw: &String) -> Key {
        Key::hash(raw)
    }
}
