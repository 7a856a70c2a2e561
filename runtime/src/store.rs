//! In-memory reference store backing the bundled host adapters.
//!
//! Resources are keyed by numeric ids assigned on create. App storage is a flat
//! key/value map; [`apply_storage`] holds the `storage.*` semantics so every
//! adapter that keeps its own map behaves the same way.

use ahash::AHashMap;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tessera_core::HostResult;
use tessera_core::host::{HostError, ResourceOp, ResourceRequest, StorageOp};

#[derive(Debug, Default)]
struct Collection {
    next_id: u64,
    items: BTreeMap<u64, Value>,
}

impl Collection {
    fn matching<'a>(&'a self, filter: &'a Map<String, Value>) -> impl Iterator<Item = &'a Value> {
        self.items.values().filter(move |item| {
            filter
                .iter()
                .all(|(field, expected)| item.get(field) == Some(expected))
        })
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    resources: RwLock<AHashMap<String, Collection>>,
    storage: RwLock<AHashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `items` into `resource` as if each had been created.
    pub fn seed(&self, resource: &str, items: impl IntoIterator<Item = Value>) -> Result<(), HostError> {
        for item in items {
            self.create(resource, item)?;
        }
        Ok(())
    }

    pub fn resource(&self, op: ResourceOp, request: ResourceRequest) -> HostResult {
        let ResourceRequest {
            resource,
            id,
            body,
            query,
        } = request;
        match op {
            ResourceOp::Query => Ok(Value::Array(self.query(&resource, query.as_ref())?)),
            ResourceOp::Count => Ok(Value::from(self.query(&resource, query.as_ref())?.len())),
            ResourceOp::Get => self.get(&resource, parse_id(id.as_ref())?),
            ResourceOp::Create => self.create(&resource, body),
            ResourceOp::Update => self.update(&resource, parse_id(id.as_ref())?, body),
            ResourceOp::Delete => self.delete(&resource, parse_id(id.as_ref())?),
        }
    }

    /// Items whose fields equal every field of `filter`, in id order.
    pub fn query(&self, resource: &str, filter: Option<&Value>) -> Result<Vec<Value>, HostError> {
        let filter = match filter {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(filter)) => filter.clone(),
            Some(other) => {
                return Err(HostError::BadRequest(format!(
                    "query for `{resource}` must be an object, got {other}"
                )));
            }
        };
        let resources = self.resources.read();
        Ok(resources
            .get(resource)
            .map(|collection| collection.matching(&filter).cloned().collect())
            .unwrap_or_default())
    }

    pub fn get(&self, resource: &str, id: u64) -> HostResult {
        self.resources
            .read()
            .get(resource)
            .and_then(|collection| collection.items.get(&id))
            .cloned()
            .ok_or_else(|| not_found(resource, id))
    }

    pub fn create(&self, resource: &str, body: Value) -> HostResult {
        let Value::Object(mut fields) = body else {
            return Err(HostError::BadRequest(format!(
                "`{resource}` can only be created from an object"
            )));
        };
        let mut resources = self.resources.write();
        let collection = resources.entry(resource.to_string()).or_default();
        collection.next_id += 1;
        let id = collection.next_id;
        fields.insert("id".into(), Value::from(id));
        let item = Value::Object(fields);
        collection.items.insert(id, item.clone());
        tracing::debug!(resource, id, "Resource created");
        Ok(item)
    }

    /// Shallow-merge `body` into the stored item. The id is kept.
    pub fn update(&self, resource: &str, id: u64, body: Value) -> HostResult {
        let Value::Object(fields) = body else {
            return Err(HostError::BadRequest(format!(
                "`{resource}` can only be updated from an object"
            )));
        };
        let mut resources = self.resources.write();
        let item = resources
            .get_mut(resource)
            .and_then(|collection| collection.items.get_mut(&id))
            .ok_or_else(|| not_found(resource, id))?;
        if let Value::Object(existing) = item {
            existing.extend(fields);
            existing.insert("id".into(), Value::from(id));
        }
        Ok(item.clone())
    }

    pub fn delete(&self, resource: &str, id: u64) -> HostResult {
        self.resources
            .write()
            .get_mut(resource)
            .and_then(|collection| collection.items.remove(&id))
            .ok_or_else(|| not_found(resource, id))
    }

    pub fn storage(&self, op: StorageOp, key: &str, value: Value) -> Value {
        apply_storage(&mut self.storage.write(), op, key, value)
    }
}

/// Apply one `storage.*` operation to `map` and return its result.
///
/// | op         | result                                                        |
/// |------------|---------------------------------------------------------------|
/// | `read`     | the stored value or `null`                                    |
/// | `write`    | the written value                                             |
/// | `append`   | the new list; a missing key starts one, a scalar is wrapped   |
/// | `subtract` | the list without its last item; removing the last item (or a  |
/// |            | scalar) deletes the key and yields `null`                     |
/// | `delete`   | the removed value or `null`                                   |
pub fn apply_storage(
    map: &mut AHashMap<String, Value>,
    op: StorageOp,
    key: &str,
    value: Value,
) -> Value {
    match op {
        StorageOp::Read => map.get(key).cloned().unwrap_or(Value::Null),
        StorageOp::Write => {
            map.insert(key.to_string(), value.clone());
            value
        }
        StorageOp::Append => {
            let list = match map.remove(key) {
                None | Some(Value::Null) => vec![value],
                Some(Value::Array(mut items)) => {
                    items.push(value);
                    items
                }
                Some(scalar) => vec![scalar, value],
            };
            let list = Value::Array(list);
            map.insert(key.to_string(), list.clone());
            list
        }
        StorageOp::Subtract => match map.remove(key) {
            Some(Value::Array(mut items)) => {
                items.pop();
                if items.is_empty() {
                    Value::Null
                } else {
                    let list = Value::Array(items);
                    map.insert(key.to_string(), list.clone());
                    list
                }
            }
            _ => Value::Null,
        },
        StorageOp::Delete => map.remove(key).unwrap_or(Value::Null),
    }
}

/// Ids are numbers; numeric strings (e.g. from a URL) are accepted as well.
fn parse_id(id: Option<&Value>) -> Result<u64, HostError> {
    let parsed = match id {
        Some(Value::Number(number)) => number.as_u64(),
        Some(Value::String(text)) => text.parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| match id {
        Some(id) => HostError::BadRequest(format!("`{id}` is not a valid id")),
        None => HostError::BadRequest("an id is required".into()),
    })
}

fn not_found(resource: &str, id: u64) -> HostError {
    HostError::NotFound(format!("{resource} {id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(id: Option<Value>, body: Value, query: Option<Value>) -> ResourceRequest {
        ResourceRequest {
            resource: "person".into(),
            id,
            body,
            query,
        }
    }

    #[test]
    fn resources_get_sequential_ids() {
        let store = MemoryStore::new();
        let first = store
            .resource(ResourceOp::Create, request(None, json!({ "name": "Ada" }), None))
            .unwrap();
        let second = store
            .resource(ResourceOp::Create, request(None, json!({ "name": "Grace" }), None))
            .unwrap();
        assert_eq!(first["id"], json!(1));
        assert_eq!(second["id"], json!(2));

        let fetched = store
            .resource(ResourceOp::Get, request(Some(json!("2")), Value::Null, None))
            .unwrap();
        assert_eq!(fetched, json!({ "name": "Grace", "id": 2 }));
    }

    #[test]
    fn query_filters_by_equality() {
        let store = MemoryStore::new();
        store
            .seed(
                "person",
                [
                    json!({ "team": "a", "name": "Ada" }),
                    json!({ "team": "b", "name": "Grace" }),
                    json!({ "team": "a", "name": "Linus" }),
                ],
            )
            .unwrap();

        let team_a = store
            .resource(ResourceOp::Query, request(None, Value::Null, Some(json!({ "team": "a" }))))
            .unwrap();
        assert_eq!(team_a.as_array().unwrap().len(), 2);
        assert_eq!(team_a[1]["name"], json!("Linus"));

        let count = store
            .resource(ResourceOp::Count, request(None, Value::Null, None))
            .unwrap();
        assert_eq!(count, json!(3));
    }

    #[test]
    fn update_merges_and_delete_removes() {
        let store = MemoryStore::new();
        store.create("person", json!({ "name": "Ada", "age": 36 })).unwrap();

        let updated = store.update("person", 1, json!({ "age": 37, "id": 99 })).unwrap();
        assert_eq!(updated, json!({ "name": "Ada", "age": 37, "id": 1 }));

        store.delete("person", 1).unwrap();
        assert_eq!(store.get("person", 1), Err(HostError::NotFound("person 1".into())));
        assert!(matches!(
            store.update("person", 1, json!({})),
            Err(HostError::NotFound(_))
        ));
    }

    #[test]
    fn invalid_ids_are_bad_requests() {
        let store = MemoryStore::new();
        let err = store
            .resource(ResourceOp::Get, request(Some(json!("abc")), Value::Null, None))
            .unwrap_err();
        assert_eq!(err.status(), 400);
        let err = store
            .resource(ResourceOp::Delete, request(None, Value::Null, None))
            .unwrap_err();
        assert!(matches!(err, HostError::BadRequest(_)));
    }

    #[test]
    fn storage_append_and_subtract() {
        let store = MemoryStore::new();
        assert_eq!(store.storage(StorageOp::Append, "cart", json!("apple")), json!(["apple"]));
        assert_eq!(
            store.storage(StorageOp::Append, "cart", json!("pear")),
            json!(["apple", "pear"])
        );
        assert_eq!(store.storage(StorageOp::Subtract, "cart", Value::Null), json!(["apple"]));
        assert_eq!(store.storage(StorageOp::Subtract, "cart", Value::Null), Value::Null);
        assert_eq!(store.storage(StorageOp::Read, "cart", Value::Null), Value::Null);
    }

    #[test]
    fn storage_append_wraps_scalars() {
        let mut map = AHashMap::new();
        apply_storage(&mut map, StorageOp::Write, "last", json!(1));
        assert_eq!(apply_storage(&mut map, StorageOp::Append, "last", json!(2)), json!([1, 2]));
        assert_eq!(apply_storage(&mut map, StorageOp::Delete, "last", Value::Null), json!([1, 2]));
        assert!(map.is_empty());
    }
}
