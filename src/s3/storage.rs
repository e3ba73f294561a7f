use super::{DeleteObject, GetObject, ListObjects, ListSource, ObjectStore, PutObject};
use crate::codec::{merge, Codec, Item};
use crate::config::StoreConfig;
use crate::constraint::Constraint;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::kv::{KeyVal, WILDCARD};
use crate::seq::Seq;
use crate::thing::{Key, Thing};
use crate::transport::instrument;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Bucket-backed key/value store of entity `T`
pub struct S3<T, C> {
    client: C,
    codec: Codec<T>,
    bucket: String,
    page_size: Option<usize>,
}

impl<T, C> S3<T, C> {
    pub fn new(client: C, bucket: impl Into<String>) -> Self {
        Self {
            client,
            codec: Codec::default(),
            bucket: bucket.into(),
            page_size: None,
        }
    }

    /// Build from a `s3:///bucket` store URI
    pub fn from_config(client: C, config: &StoreConfig) -> Result<Self> {
        let endpoint = config.endpoint()?;
        if endpoint.scheme != "s3" {
            return Err(Error::Config(format!(
                "object backend requires a s3:// uri, got {}",
                config.uri
            )));
        }

        Ok(Self::new(client, endpoint.table)
            .with_codec(Codec::new(endpoint.hash_attribute, endpoint.sort_attribute))
            .with_page_size(config.page_size))
    }

    pub fn with_codec(mut self, codec: Codec<T>) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_page_size(mut self, n: usize) -> Self {
        self.page_size = (n > 0).then_some(n);
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn codec(&self) -> &Codec<T> {
        &self.codec
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// Object path of a key: `hash` or `hash/sort`
pub(crate) fn path_of<K: Thing + ?Sized>(key: &K) -> Result<String> {
    if key.hash_key().is_empty() {
        return Err(Error::InvalidKey("hash key is empty".to_string()));
    }
    Ok(Key::of(key).to_string())
}

fn ignore_constraints<T>(op: &str, constraints: &[Constraint<T>]) {
    if !constraints.is_empty() {
        log::warn!(
            "object storage does not support conditional {}; {} constraint(s) ignored",
            op,
            constraints.len()
        );
    }
}

impl<T, C> S3<T, C>
where
    T: Thing + Serialize + DeserializeOwned,
    C: ObjectStore,
{
    fn read(&self, ctx: &Context, path: &str) -> Result<Option<Item>> {
        let req = GetObject {
            bucket: self.bucket.clone(),
            key: path.to_string(),
        };
        let body = instrument("get", &self.bucket, || self.client.get_object(ctx, req))
            .map_err(|e| ctx.classify(Error::service_io(e)))?;

        body.map(|body| serde_json::from_slice::<Item>(&body).map_err(|e| Error::InvalidEntity(e.to_string())))
            .transpose()
    }

    fn write(&self, ctx: &Context, path: String, item: &Item) -> Result<()> {
        let body = serde_json::to_vec(item).map_err(|e| Error::InvalidEntity(e.to_string()))?;
        let req = PutObject {
            bucket: self.bucket.clone(),
            key: path,
            body,
        };
        instrument("put", &self.bucket, || self.client.put_object(ctx, req))
            .map_err(|e| ctx.classify(Error::service_io(e)))
    }

    /// Decoded object at `path`, `None` when absent
    pub(crate) fn fetch(&self, ctx: &Context, path: &str) -> Result<Option<T>> {
        ctx.check()?;
        self.read(ctx, path)?.map(|item| self.codec.decode(item)).transpose()
    }
}

impl<T, C> KeyVal<T> for S3<T, C>
where
    T: Thing + Serialize + DeserializeOwned,
    C: ObjectStore,
{
    type Source<'a> = ListSource<'a, T, C> where Self: 'a;

    fn get(&self, ctx: &Context, key: &T) -> Result<T> {
        let path = path_of(key)?;
        self.fetch(ctx, &path)?
            .ok_or_else(|| Error::NotFound { key: Key::of(key) })
    }

    fn put(&self, ctx: &Context, entity: &T, constraints: &[Constraint<T>]) -> Result<()> {
        ignore_constraints("put", constraints);
        ctx.check()?;
        let item = self.codec.encode(entity)?;
        self.write(ctx, path_of(entity)?, &item)
    }

    fn remove(&self, ctx: &Context, key: &T, constraints: &[Constraint<T>]) -> Result<()> {
        ignore_constraints("remove", constraints);
        ctx.check()?;
        let req = DeleteObject {
            bucket: self.bucket.clone(),
            key: path_of(key)?,
        };
        instrument("remove", &self.bucket, || self.client.delete_object(ctx, req))
            .map_err(|e| ctx.classify(Error::service_io(e)))
    }

    fn update(&self, ctx: &Context, entity: &T, constraints: &[Constraint<T>]) -> Result<T> {
        ignore_constraints("update", constraints);
        ctx.check()?;
        let path = path_of(entity)?;
        let patch = self.codec.encode(entity)?;

        // a missing object is created from the patch
        let item = match self.read(ctx, &path)? {
            Some(base) => merge(base, patch),
            None => patch,
        };
        self.write(ctx, path, &item)?;
        self.codec.decode(item)
    }

    fn query<'a>(&'a self, ctx: &Context, key: &T) -> Seq<ListSource<'a, T, C>> {
        if key.hash_key().is_empty() {
            return Seq::failed(ctx, Error::InvalidKey("hash key is empty".to_string()));
        }

        let prefix = match key.sort_key() {
            "" => key.hash_key().to_string(),
            WILDCARD => format!("{}/", key.hash_key()),
            sort => format!("{}/{}", key.hash_key(), sort),
        };
        let list = ListObjects {
            bucket: self.bucket.clone(),
            prefix,
            start_after: None,
            max_keys: None,
        };

        let seq = Seq::new(ctx, ListSource::new(self, list));
        match self.page_size {
            Some(n) => seq.page_size(n),
            None => seq,
        }
    }
}
