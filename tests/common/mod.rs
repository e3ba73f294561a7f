//! In-memory table and bucket transports shared by the integration tests.
//!
//! The table evaluates the condition, key-condition and update expressions the
//! crate renders (`AND`-joined fragments over `#__a__` / `:__a__` placeholders),
//! so conditional writes behave like a real store. Reads honour the projection
//! expression: attributes it does not name are not returned.

#![allow(dead_code)]

use keyval::ddb::{DeleteItem, DynamoDb, GetItem, PutItem, Query, QueryPage, UpdateItem};
use keyval::s3::{DeleteObject, GetObject, ListObjects, ListPage, ObjectStore, PutObject};
use keyval::{Context, Item, TransportError};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

type Names = BTreeMap<String, String>;
type Values = BTreeMap<String, Value>;

// ============================================================================
// Call log shared by both transports
// ============================================================================

#[derive(Clone, Default)]
pub struct Calls {
    counts: Arc<Mutex<HashMap<&'static str, usize>>>,
    failure: Arc<Mutex<Option<TransportError>>>,
}

impl Calls {
    fn enter(&self, op: &'static str) -> Result<(), TransportError> {
        *self.counts.lock().unwrap().entry(op).or_default() += 1;
        match self.failure.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn count(&self, op: &str) -> usize {
        self.counts.lock().unwrap().get(op).copied().unwrap_or(0)
    }

    /// Fail the next request of any kind
    pub fn fail_next(&self, err: TransportError) {
        *self.failure.lock().unwrap() = Some(err);
    }
}

// ============================================================================
// Table
// ============================================================================

#[derive(Clone)]
pub struct MemoryTable {
    pub calls: Calls,
    items: Arc<Mutex<BTreeMap<(String, String), Item>>>,
    hash: String,
    sort: String,
    /// Items per query page when the request sets no limit
    page_max: usize,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::with_page_max(1000)
    }

    pub fn with_page_max(page_max: usize) -> Self {
        Self {
            calls: Calls::default(),
            items: Arc::default(),
            hash: "prefix".into(),
            sort: "suffix".into(),
            page_max,
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    fn key(&self, item: &Item) -> (String, String) {
        let read = |a: &str| item.get(a).and_then(Value::as_str).unwrap_or_default().to_string();
        (read(&self.hash), read(&self.sort))
    }

    fn check(
        current: Option<&Item>,
        condition: &Option<String>,
        names: &Names,
        values: &Values,
    ) -> Result<(), TransportError> {
        match condition {
            Some(expr) if !holds(current, expr, names, values) => Err(TransportError::condition_failed(
                "ConditionalCheckFailedException: The conditional request failed",
            )),
            _ => Ok(()),
        }
    }
}

impl DynamoDb for MemoryTable {
    fn get_item(&self, _ctx: &Context, req: GetItem) -> Result<Option<Item>, TransportError> {
        self.calls.enter("get_item")?;
        let item = self.items.lock().unwrap().get(&self.key(&req.key)).cloned();
        Ok(item.map(|item| project(item, &req.projection, &req.names)))
    }

    fn put_item(&self, _ctx: &Context, req: PutItem) -> Result<(), TransportError> {
        self.calls.enter("put_item")?;
        let key = self.key(&req.item);
        let mut items = self.items.lock().unwrap();
        Self::check(items.get(&key), &req.condition, &req.names, &req.values)?;
        items.insert(key, req.item);
        Ok(())
    }

    fn delete_item(&self, _ctx: &Context, req: DeleteItem) -> Result<(), TransportError> {
        self.calls.enter("delete_item")?;
        let key = self.key(&req.key);
        let mut items = self.items.lock().unwrap();
        Self::check(items.get(&key), &req.condition, &req.names, &req.values)?;
        items.remove(&key);
        Ok(())
    }

    fn update_item(&self, _ctx: &Context, req: UpdateItem) -> Result<Item, TransportError> {
        self.calls.enter("update_item")?;
        let key = self.key(&req.key);
        let mut items = self.items.lock().unwrap();
        Self::check(items.get(&key), &req.condition, &req.names, &req.values)?;

        let mut item = items.get(&key).cloned().unwrap_or_else(|| req.key.clone());
        let assignments = req.update.strip_prefix("SET ").unwrap_or_default();
        for assignment in assignments.split(',') {
            let (name, value) = assignment
                .split_once('=')
                .ok_or_else(|| TransportError::other(format!("invalid update {}", req.update)))?;
            let attribute = req.names.get(name.trim()).cloned().unwrap_or_default();
            let value = req.values.get(value.trim()).cloned().unwrap_or(Value::Null);
            item.insert(attribute, value);
        }
        items.insert(key, item.clone());
        Ok(item)
    }

    fn query(&self, _ctx: &Context, req: &Query) -> Result<QueryPage, TransportError> {
        self.calls.enter("query")?;
        let items = self.items.lock().unwrap();

        let mut matched: Vec<(&(String, String), &Item)> = items
            .iter()
            .filter(|(_, item)| holds(Some(item), &req.key_condition, &req.names, &req.values))
            .collect();
        if !req.scan_forward {
            matched.reverse();
        }

        if let Some(start) = &req.exclusive_start_key {
            let start = self.key(start);
            matched.retain(|(key, _)| match key.cmp(&&start) {
                Ordering::Greater => req.scan_forward,
                Ordering::Less => !req.scan_forward,
                Ordering::Equal => false,
            });
        }

        let limit = req.limit.unwrap_or(self.page_max).min(self.page_max);
        let more = matched.len() > limit;
        let page: Vec<&Item> = matched.into_iter().take(limit).map(|(_, item)| item).collect();

        // the continuation is the stored key, whatever the projection
        let last_evaluated_key = if more {
            page.last().map(|item| {
                item.iter()
                    .filter(|(k, _)| **k == self.hash || **k == self.sort)
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
        } else {
            None
        };
        Ok(QueryPage {
            items: page
                .into_iter()
                .map(|item| project(item.clone(), &req.projection, &req.names))
                .collect(),
            last_evaluated_key,
        })
    }
}

/// Keep only the attributes named by a `#__a__, #__b__` projection
fn project(item: Item, projection: &Option<String>, names: &Names) -> Item {
    let Some(expr) = projection else {
        return item;
    };
    let wanted: Vec<&str> = expr
        .split(',')
        .filter_map(|placeholder| names.get(placeholder.trim()))
        .map(String::as_str)
        .collect();
    item.into_iter().filter(|(k, _)| wanted.contains(&k.as_str())).collect()
}

fn holds(item: Option<&Item>, expr: &str, names: &Names, values: &Values) -> bool {
    expr.split(" AND ").all(|fragment| holds_one(item, fragment.trim(), names, values))
}

fn holds_one(item: Option<&Item>, fragment: &str, names: &Names, values: &Values) -> bool {
    let attribute = |placeholder: &str| {
        names
            .get(placeholder.trim())
            .and_then(|name| item.and_then(|item| item.get(name)))
            .filter(|v| !v.is_null())
    };

    if let Some(name) = call(fragment, "attribute_exists") {
        return attribute(name).is_some();
    }
    if let Some(name) = call(fragment, "attribute_not_exists") {
        return attribute(name).is_none();
    }
    if let Some(args) = call(fragment, "begins_with") {
        let Some((name, value)) = args.split_once(',') else {
            return false;
        };
        return match (attribute(name).and_then(Value::as_str), values.get(value.trim()).and_then(Value::as_str)) {
            (Some(a), Some(prefix)) => a.starts_with(prefix),
            _ => false,
        };
    }

    let mut parts = fragment.split_whitespace();
    let (Some(name), Some(op), Some(value)) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    let (Some(a), Some(b)) = (attribute(name), values.get(value)) else {
        return false;
    };
    let ord = compare(a, b);
    match op {
        "=" => a == b,
        "<>" => a != b,
        "<" => ord == Some(Ordering::Less),
        "<=" => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
        ">" => ord == Some(Ordering::Greater),
        ">=" => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
        _ => false,
    }
}

fn call<'a>(fragment: &'a str, function: &str) -> Option<&'a str> {
    fragment
        .strip_prefix(function)?
        .strip_prefix('(')?
        .strip_suffix(')')
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

// ============================================================================
// Bucket
// ============================================================================

#[derive(Clone)]
pub struct MemoryBucket {
    pub calls: Calls,
    objects: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
    page_max: usize,
}

impl MemoryBucket {
    pub fn new() -> Self {
        Self::with_page_max(1000)
    }

    pub fn with_page_max(page_max: usize) -> Self {
        Self {
            calls: Calls::default(),
            objects: Arc::default(),
            page_max,
        }
    }

    pub fn paths(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    /// Store a raw body, bypassing the codec
    pub fn insert_raw(&self, path: &str, body: &[u8]) {
        self.objects.lock().unwrap().insert(path.to_string(), body.to_vec());
    }
}

impl ObjectStore for MemoryBucket {
    fn get_object(&self, _ctx: &Context, req: GetObject) -> Result<Option<Vec<u8>>, TransportError> {
        self.calls.enter("get_object")?;
        Ok(self.objects.lock().unwrap().get(&req.key).cloned())
    }

    fn put_object(&self, _ctx: &Context, req: PutObject) -> Result<(), TransportError> {
        self.calls.enter("put_object")?;
        self.objects.lock().unwrap().insert(req.key, req.body);
        Ok(())
    }

    fn delete_object(&self, _ctx: &Context, req: DeleteObject) -> Result<(), TransportError> {
        self.calls.enter("delete_object")?;
        self.objects.lock().unwrap().remove(&req.key);
        Ok(())
    }

    fn list_objects(&self, _ctx: &Context, req: &ListObjects) -> Result<ListPage, TransportError> {
        self.calls.enter("list_objects")?;
        let objects = self.objects.lock().unwrap();
        let mut keys: Vec<String> = objects
            .keys()
            .filter(|k| k.starts_with(&req.prefix))
            .filter(|k| req.start_after.as_ref().map_or(true, |after| k.as_str() > after.as_str()))
            .cloned()
            .collect();

        let limit = req.max_keys.unwrap_or(self.page_max).min(self.page_max);
        let is_truncated = keys.len() > limit;
        keys.truncate(limit);
        Ok(ListPage { keys, is_truncated })
    }
}
