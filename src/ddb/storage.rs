use super::{DeleteItem, DynamoDb, GetItem, Projection, PutItem, Query, QuerySource, UpdateItem};
use crate::codec::Codec;
use crate::config::StoreConfig;
use crate::constraint::expression::{
    bind_value, placeholder_name, placeholder_value, AttributeNames, AttributeValues,
};
use crate::constraint::{render, Constraint};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::kv::{write_failure, KeyVal, WILDCARD};
use crate::schema::Schema;
use crate::seq::Seq;
use crate::thing::{Key, Thing};
use crate::transport::instrument;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Table-backed key/value store of entity `T`
///
/// # Example
///
/// ```no_run
/// use keyval::{ddb::{Ddb, DynamoDb}, Context, KeyVal, StoreConfig};
///
/// # fn run<C: DynamoDb>(client: C) -> keyval::Result<()> {
/// #[derive(serde::Serialize, serde::Deserialize, keyval::Thing, keyval::Schema)]
/// struct Person {
///     #[hash_key]
///     prefix: String,
///     #[sort_key]
///     suffix: String,
///     #[attribute = "anothername,omitempty"]
///     #[serde(rename = "anothername")]
///     name: String,
/// }
///
/// let db: Ddb<Person, C> = Ddb::from_config(client, &StoreConfig::load()?)?;
/// let ctx = Context::background();
/// let (name,) = keyval::schema!(Person => name: String);
///
/// let joe = Person { prefix: "org".into(), suffix: "1".into(), name: "Joe".into() };
/// db.put(&ctx, &joe, &[name.not_exists()])?;
/// # Ok(())
/// # }
/// ```
pub struct Ddb<T, C> {
    client: C,
    codec: Codec<T>,
    table: String,
    index: Option<String>,
    projection: Projection,
    page_size: Option<usize>,
}

impl<T: Schema, C> Ddb<T, C> {
    pub fn new(client: C, table: impl Into<String>) -> Self {
        let codec = Codec::default();
        Self {
            projection: Projection::of::<T>(&[codec.hash_attribute(), codec.sort_attribute()]),
            client,
            codec,
            table: table.into(),
            index: None,
            page_size: None,
        }
    }

    /// Key attribute names; the projection follows them
    pub fn with_codec(mut self, codec: Codec<T>) -> Self {
        self.projection = Projection::of::<T>(&[codec.hash_attribute(), codec.sort_attribute()]);
        self.codec = codec;
        self
    }

    /// Build from a `ddb:///table[/index]?prefix=..&suffix=..` store URI
    pub fn from_config(client: C, config: &StoreConfig) -> Result<Self> {
        let endpoint = config.endpoint()?;
        if endpoint.scheme != "ddb" {
            return Err(Error::Config(format!(
                "table backend requires a ddb:// uri, got {}",
                config.uri
            )));
        }

        let db = Self::new(client, endpoint.table)
            .with_codec(Codec::new(endpoint.hash_attribute, endpoint.sort_attribute))
            .with_page_size(config.page_size);
        Ok(match endpoint.index {
            Some(index) => db.with_index(index),
            None => db,
        })
    }
}

impl<T, C> Ddb<T, C> {
    /// Query a secondary index instead of the table
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Page size used by streaming queries
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

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl<T, C> KeyVal<T> for Ddb<T, C>
where
    T: Thing + Serialize + DeserializeOwned,
    C: DynamoDb,
{
    type Source<'a> = QuerySource<'a, T, C> where Self: 'a;

    fn get(&self, ctx: &Context, key: &T) -> Result<T> {
        ctx.check()?;
        let req = GetItem {
            table: self.table.clone(),
            key: self.codec.encode_key(key)?,
            projection: self.projection.expression.clone(),
            names: self.projection.names.clone(),
        };

        let item = instrument("get", &self.table, || self.client.get_item(ctx, req))
            .map_err(|e| ctx.classify(Error::service_io(e)))?;

        match item {
            Some(item) => self.codec.decode(item),
            None => Err(Error::NotFound { key: Key::of(key) }),
        }
    }

    fn put(&self, ctx: &Context, entity: &T, constraints: &[Constraint<T>]) -> Result<()> {
        ctx.check()?;
        let mut req = PutItem {
            table: self.table.clone(),
            item: self.codec.encode(entity)?,
            ..Default::default()
        };
        if let Some(cond) = render(constraints)? {
            req.condition = Some(cond.expression);
            req.names = cond.names;
            req.values = cond.values;
        }

        let condition = req.condition.clone();
        instrument("put", &self.table, || self.client.put_item(ctx, req))
            .map_err(|e| write_failure(ctx, "put", e, Key::of(entity), condition.as_deref()))
    }

    fn remove(&self, ctx: &Context, key: &T, constraints: &[Constraint<T>]) -> Result<()> {
        ctx.check()?;
        let mut req = DeleteItem {
            table: self.table.clone(),
            key: self.codec.encode_key(key)?,
            ..Default::default()
        };
        if let Some(cond) = render(constraints)? {
            req.condition = Some(cond.expression);
            req.names = cond.names;
            req.values = cond.values;
        }

        let condition = req.condition.clone();
        instrument("remove", &self.table, || self.client.delete_item(ctx, req))
            .map_err(|e| write_failure(ctx, "remove", e, Key::of(key), condition.as_deref()))
    }

    fn update(&self, ctx: &Context, entity: &T, constraints: &[Constraint<T>]) -> Result<T> {
        ctx.check()?;
        let item = self.codec.encode(entity)?;

        // null attributes are not part of the patch
        let patch: Vec<_> = item
            .iter()
            .filter(|(attribute, value)| !self.codec.is_key_attribute(attribute) && !value.is_null())
            .collect();
        if patch.is_empty() {
            return Err(Error::InvalidEntity(format!(
                "update of {} has no attributes to set",
                Key::of(entity)
            )));
        }

        let mut names = AttributeNames::new();
        let mut values = AttributeValues::new();
        let condition = render(constraints)?
            .map(|cond| cond.merge_into(&mut names, &mut values))
            .transpose()?;

        let mut set = Vec::with_capacity(patch.len());
        for (attribute, value) in patch {
            let name = placeholder_name(attribute);
            let placeholder = bind_value(&mut values, attribute, value);
            set.push(format!("{name}={placeholder}"));
            names.insert(name, attribute.clone());
        }

        let req = UpdateItem {
            table: self.table.clone(),
            key: self.codec.key_only(&item),
            update: format!("SET {}", set.join(",")),
            condition: condition.clone(),
            names,
            values,
        };

        let attributes = instrument("update", &self.table, || self.client.update_item(ctx, req))
            .map_err(|e| write_failure(ctx, "update", e, Key::of(entity), condition.as_deref()))?;

        self.codec.decode(attributes)
    }

    fn query<'a>(&'a self, ctx: &Context, key: &T) -> Seq<QuerySource<'a, T, C>> {
        if let Err(err) = self.codec.encode_key(key) {
            return Seq::failed(ctx, err);
        }

        let hash = self.codec.hash_attribute();
        let mut names = self.projection.names.clone();
        let mut values = AttributeValues::new();
        let mut key_condition = format!("{} = {}", placeholder_name(hash), placeholder_value(hash));
        names.insert(placeholder_name(hash), hash.to_string());
        values.insert(placeholder_value(hash), Value::String(key.hash_key().to_string()));

        let sort_key = key.sort_key();
        if !sort_key.is_empty() && sort_key != WILDCARD {
            let sort = self.codec.sort_attribute();
            key_condition.push_str(&format!(
                " AND begins_with({}, {})",
                placeholder_name(sort),
                placeholder_value(sort)
            ));
            names.insert(placeholder_name(sort), sort.to_string());
            values.insert(placeholder_value(sort), Value::String(sort_key.to_string()));
        }

        let query = Query {
            table: self.table.clone(),
            index: self.index.clone(),
            key_condition,
            projection: self.projection.expression.clone(),
            names,
            values,
            limit: None,
            exclusive_start_key: None,
            scan_forward: true,
        };

        let seq = Seq::new(ctx, QuerySource::new(self, query));
        match self.page_size {
            Some(n) => seq.page_size(n),
            None => seq,
        }
    }
}
