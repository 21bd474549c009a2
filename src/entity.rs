// src/entity.rs

use crate::client::UsergridClient;
use crate::error::UsergridError;
use crate::types::{millis_to_datetime, DateField, UsergridResponse};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Properties the server owns. They are never sent in a request body and cannot be `set`.
pub const READ_ONLY_PROPERTIES: &[&str] = &["uuid", "created", "modified", "metadata", "uri"];

/// One Usergrid record: a JSON object plus the collection it lives in.
///
/// The `uuid` is kept apart from the other properties and can only be filled in from a
/// server response. Local writes through [`set`](Entity::set) and
/// [`remove`](Entity::remove) are tracked as dirty until the next successful
/// [`save`](Entity::save) or [`fetch`](Entity::fetch).
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    collection: String,
    uuid: Option<String>,
    properties: Map<String, Value>,
    dirty: BTreeSet<String>,
}

impl Entity {
    /// Creates an unsaved entity for `collection` (e.g. `"books"`).
    pub fn new(collection: &str) -> Self {
        Entity {
            collection: collection.to_string(),
            uuid: None,
            properties: Map::new(),
            dirty: BTreeSet::new(),
        }
    }

    /// Wraps a record decoded from a server response. Nothing is dirty afterwards.
    pub fn from_record(collection: &str, record: Map<String, Value>) -> Self {
        let mut entity = Entity::new(collection);
        entity.merge_record(record);
        entity
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn uuid(&self) -> Option<&str> {
        self.uuid.as_deref()
    }

    /// The entity's `type` property, as reported by the server (usually singular, e.g. `book`).
    pub fn entity_type(&self) -> Option<&str> {
        self.properties.get("type").and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.properties.get("name").and_then(Value::as_str)
    }

    /// The server URI of this entity, when a response supplied one.
    pub fn uri(&self) -> Option<&str> {
        self.properties.get("uri").and_then(Value::as_str)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp(DateField::Created)
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp(DateField::Modified)
    }

    fn timestamp(&self, field: DateField) -> Option<DateTime<Utc>> {
        self.properties.get(field.key()).and_then(millis_to_datetime)
    }

    /// Current in-memory value of `key`. The identifier is exposed through [`uuid`](Entity::uuid).
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Reads `key` and deserializes it into `T`; `None` if absent or of another shape.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.properties
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    /// Stores `value` under `key` locally and marks it dirty. No request is made.
    pub fn set<V: Serialize>(&mut self, key: &str, value: V) -> Result<&mut Self, UsergridError> {
        check_writable(key)?;
        let value = serde_json::to_value(value)?;
        self.properties.insert(key.to_string(), value);
        self.dirty.insert(key.to_string());
        Ok(self)
    }

    /// Applies every pair of `values` as if by [`set`](Entity::set). Nothing is written
    /// when any key is read-only.
    pub fn set_all(&mut self, values: Map<String, Value>) -> Result<&mut Self, UsergridError> {
        for key in values.keys() {
            check_writable(key)?;
        }
        for (key, value) in values {
            self.dirty.insert(key.clone());
            self.properties.insert(key, value);
        }
        Ok(self)
    }

    /// Clears `key` locally. The next partial update sends it as `null`, which deletes it
    /// on the server.
    pub fn remove(&mut self, key: &str) -> Result<&mut Self, UsergridError> {
        check_writable(key)?;
        self.properties.insert(key.to_string(), Value::Null);
        self.dirty.insert(key.to_string());
        Ok(self)
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Names of properties changed since the last save or fetch, in sorted order.
    pub fn dirty_properties(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    /// The full record including `uuid`, as the server would return it.
    pub fn to_json(&self) -> Value {
        let mut map = self.properties.clone();
        if let Some(uuid) = &self.uuid {
            map.insert("uuid".to_string(), Value::String(uuid.clone()));
        }
        Value::Object(map)
    }

    // Body for a create: every property the client may write.
    fn create_body(&self) -> Map<String, Value> {
        self.properties
            .iter()
            .filter(|(k, _)| !READ_ONLY_PROPERTIES.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    // Body for a partial update: only what changed locally.
    fn update_body(&self) -> Map<String, Value> {
        self.dirty
            .iter()
            .map(|k| {
                (
                    k.clone(),
                    self.properties.get(k).cloned().unwrap_or(Value::Null),
                )
            })
            .collect()
    }

    // Folds a server record into this entity. The uuid is only taken when none is known yet.
    fn merge_record(&mut self, record: Map<String, Value>) {
        for (key, value) in record {
            if key == "uuid" {
                match (&self.uuid, value.as_str()) {
                    (None, Some(id)) => self.uuid = Some(id.to_string()),
                    (Some(existing), Some(id)) if existing != id => {
                        log::warn!(
                            "Ignoring server uuid '{}' for entity already identified as '{}'",
                            id,
                            existing
                        );
                    }
                    _ => {}
                }
            } else {
                self.properties.insert(key, value);
            }
        }
    }

    // The uuid, or else the name, checked to be a single path segment.
    pub(crate) fn identifier(&self) -> Result<&str, UsergridError> {
        let id = self.uuid().or_else(|| self.name()).ok_or_else(|| {
            UsergridError::InvalidInput(format!(
                "Entity in '{}' has neither a uuid nor a name",
                self.collection
            ))
        })?;
        validate_identifier(id)?;
        Ok(id)
    }

    /// Persists local changes.
    ///
    /// An entity with a `uuid` is updated with `PUT <collection>/<uuid>` carrying only the
    /// dirty properties; if nothing is dirty no request is made. An entity without a `uuid`
    /// is created with `POST <collection>` carrying all writable properties. On success the
    /// returned record (identifier, timestamps, ...) is merged in and dirty flags are cleared.
    pub async fn save(&mut self, client: &UsergridClient) -> Result<&mut Self, UsergridError> {
        validate_collection(&self.collection)?;

        let response: UsergridResponse = if let Some(uuid) = self.uuid.clone() {
            if self.dirty.is_empty() {
                log::debug!("Entity {} has no dirty properties; skipping save", uuid);
                return Ok(self);
            }
            let endpoint = format!("{}/{}", self.collection, uuid);
            client.put(&endpoint, &self.update_body()).await?
        } else {
            client.post(&self.collection, &self.create_body()).await?
        };

        let record = first_entity(response, &self.collection)?;
        self.merge_record(record);
        self.dirty.clear();
        Ok(self)
    }

    /// Reloads the entity by uuid (or name) and discards local changes.
    pub async fn fetch(&mut self, client: &UsergridClient) -> Result<&mut Self, UsergridError> {
        validate_collection(&self.collection)?;
        let endpoint = format!("{}/{}", self.collection, self.identifier()?);
        let response: UsergridResponse = client.get(&endpoint).await?;
        let record = first_entity(response, &self.collection)?;

        self.properties.clear();
        self.merge_record(record);
        self.dirty.clear();
        Ok(self)
    }

    /// Deletes the entity on the server by uuid (or name) and consumes the local copy.
    pub async fn destroy(self, client: &UsergridClient) -> Result<(), UsergridError> {
        validate_collection(&self.collection)?;
        let endpoint = format!("{}/{}", self.collection, self.identifier()?);
        let _: UsergridResponse = client.delete(&endpoint).await?;
        Ok(())
    }
}

fn check_writable(key: &str) -> Result<(), UsergridError> {
    if key.is_empty() {
        return Err(UsergridError::InvalidInput(
            "Property name cannot be empty".to_string(),
        ));
    }
    if READ_ONLY_PROPERTIES.contains(&key) {
        return Err(UsergridError::InvalidInput(format!(
            "Property '{}' is managed by the server and cannot be set",
            key
        )));
    }
    Ok(())
}

fn first_entity(
    response: UsergridResponse,
    collection: &str,
) -> Result<Map<String, Value>, UsergridError> {
    response.entities.into_iter().next().ok_or_else(|| {
        UsergridError::UnexpectedResponse(format!(
            "Expected an entity in the response for '{}', got none",
            collection
        ))
    })
}

/// Checks a collection path such as `books` or `users/fred/likes`.
pub(crate) fn validate_collection(collection: &str) -> Result<(), UsergridError> {
    if collection.is_empty() {
        return Err(UsergridError::InvalidInput(
            "Collection name cannot be empty".to_string(),
        ));
    }
    if collection.starts_with('/') || collection.ends_with('/') {
        return Err(UsergridError::InvalidInput(format!(
            "Invalid collection '{}': must not start or end with '/'",
            collection
        )));
    }
    if !collection
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '/'))
    {
        return Err(UsergridError::InvalidInput(format!(
            "Invalid collection '{}': can only contain letters, numbers, '_', '-', '.' or '/'",
            collection
        )));
    }
    Ok(())
}

pub(crate) fn validate_identifier(id: &str) -> Result<(), UsergridError> {
    if id.is_empty() {
        return Err(UsergridError::InvalidInput(
            "Entity identifier cannot be empty".to_string(),
        ));
    }
    if id.contains(|c| matches!(c, '/' | '?' | '#')) {
        return Err(UsergridError::InvalidInput(format!(
            "Invalid entity identifier '{}'",
            id
        )));
    }
    Ok(())
}

impl UsergridClient {
    /// Creates an entity in `collection` from any serializable object.
    pub async fn create_entity<T: Serialize + Send + Sync>(
        &self,
        collection: &str,
        data: &T,
    ) -> Result<Entity, UsergridError> {
        validate_collection(collection)?;
        let response: UsergridResponse = self.post(collection, data).await?;
        Ok(Entity::from_record(
            collection,
            first_entity(response, collection)?,
        ))
    }

    /// Retrieves one entity by uuid or name.
    pub async fn get_entity(&self, collection: &str, id: &str) -> Result<Entity, UsergridError> {
        validate_collection(collection)?;
        validate_identifier(id)?;
        let endpoint = format!("{}/{}", collection, id);
        let response: UsergridResponse = self.get(&endpoint).await?;
        Ok(Entity::from_record(
            collection,
            first_entity(response, collection)?,
        ))
    }

    /// Sends `data` as a partial update to the entity identified by uuid or name.
    pub async fn update_entity<T: Serialize + Send + Sync>(
        &self,
        collection: &str,
        id: &str,
        data: &T,
    ) -> Result<Entity, UsergridError> {
        validate_collection(collection)?;
        validate_identifier(id)?;
        let endpoint = format!("{}/{}", collection, id);
        let response: UsergridResponse = self.put(&endpoint, data).await?;
        Ok(Entity::from_record(
            collection,
            first_entity(response, collection)?,
        ))
    }

    pub async fn delete_entity(&self, collection: &str, id: &str) -> Result<(), UsergridError> {
        validate_collection(collection)?;
        validate_identifier(id)?;
        let endpoint = format!("{}/{}", collection, id);
        let _: UsergridResponse = self.delete(&endpoint).await?;
        Ok(())
    }
}
