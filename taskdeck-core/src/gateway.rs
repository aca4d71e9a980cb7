//! Typed CRUD over one backend collection per entity.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::picklist::{Picklist, PicklistMode};
use crate::record::RecordBuilder;
use crate::store::{
    Condition, Field, OrderBy, Query, Record, RecordId, RecordStore, WriteResponse, WriteResult,
};
use crate::validation::Validate;

/// A model stored in a backend collection.
pub trait Entity: Sized + Clone + Send + Sync + 'static {
    /// Backend collection name.
    const COLLECTION: &'static str;
    /// Capitalised singular used in messages ("Quote").
    const LABEL: &'static str;
    /// Fields requested on every read.
    const FIELDS: &'static [&'static str];

    type Create: Validate + Send + Sync;
    type Update: Send + Sync;

    fn id(&self) -> RecordId;

    fn decode(record: &Record, mode: PicklistMode) -> Result<Self>;

    fn encode_create(input: &Self::Create) -> Record;

    /// Only the fields present in `input`; the gateway adds `Id`.
    fn encode_update(input: &Self::Update) -> Record;

    fn order_by() -> Option<OrderBy> {
        None
    }
}

/// An entity shown on a board, bucketed by one picklist field.
pub trait BoardEntity: Entity {
    type Key: Picklist + Send + Sync;

    /// Backend field holding the key.
    const KEY_FIELD: &'static str;
    /// "stage" or "status", used in notices.
    const KEY_NOUN: &'static str;

    fn key(&self) -> Self::Key;

    /// Fields written when an entity moves to `key`.
    fn key_patch(key: Self::Key) -> Record {
        RecordBuilder::new().set(Self::KEY_FIELD, key.label()).build()
    }
}

fn lower(label: &str) -> String {
    label.to_lowercase()
}

/// CRUD for the entity type `E` against a shared [`RecordStore`].
pub struct Gateway<E> {
    store: Arc<dyn RecordStore>,
    mode: PicklistMode,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Gateway<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            mode: self.mode,
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Gateway<E> {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            mode: PicklistMode::default(),
            _entity: PhantomData,
        }
    }

    pub fn with_mode(mut self, mode: PicklistMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn mode(&self) -> PicklistMode {
        self.mode
    }

    fn base_query() -> Query {
        let query = Query::select(E::FIELDS);
        match E::order_by() {
            Some(order) => query.order(order),
            None => query,
        }
    }

    fn decode_all(&self, records: &[Record]) -> Result<Vec<E>> {
        records.iter().map(|r| E::decode(r, self.mode)).collect()
    }

    pub async fn list(&self) -> Result<Vec<E>> {
        self.list_matching(Vec::new()).await
    }

    pub async fn list_matching(&self, conditions: Vec<Condition>) -> Result<Vec<E>> {
        let mut query = Self::base_query();
        query.conditions = conditions;
        tracing::debug!(collection = E::COLLECTION, "fetching records");

        let response = self.store.fetch(E::COLLECTION, &query).await?;
        if !response.success {
            tracing::error!(collection = E::COLLECTION, message = ?response.message, "fetch failed");
            return Err(Error::backend(
                response.message,
                format!("Failed to fetch {}s", lower(E::LABEL)),
            ));
        }
        self.decode_all(response.data.as_deref().unwrap_or_default())
    }

    pub async fn get(&self, id: RecordId) -> Result<E> {
        let fields: Vec<Field> = E::FIELDS.iter().map(|f| Field::named(f)).collect();
        let response = self.store.get_by_id(E::COLLECTION, id, &fields).await?;
        if !response.success {
            tracing::error!(collection = E::COLLECTION, id, message = ?response.message, "lookup failed");
            return Err(Error::backend(
                response.message,
                format!("{} not found", E::LABEL),
            ));
        }
        match response.data {
            Some(record) => E::decode(&record, self.mode),
            None => Err(Error::NotFound {
                entity: E::LABEL,
                id,
            }),
        }
    }

    pub async fn create(&self, input: &E::Create) -> Result<E> {
        input.validate().map_err(Error::Validation)?;
        let default = format!("Failed to create {}", lower(E::LABEL));

        let response = self
            .store
            .create(E::COLLECTION, vec![E::encode_create(input)])
            .await?;
        let created = self.first_written(response, &default)?;
        tracing::info!(collection = E::COLLECTION, id = created.id(), "record created");
        Ok(created)
    }

    pub async fn update(&self, id: RecordId, input: &E::Update) -> Result<E> {
        let default = format!("Failed to update {}", lower(E::LABEL));
        self.write_fields(id, E::encode_update(input), &default)
            .await
    }

    /// Writes `fields` onto record `id` and returns the updated entity.
    pub async fn write_fields(&self, id: RecordId, fields: Record, default: &str) -> Result<E> {
        let mut record = RecordBuilder::with_id(id).build();
        record.extend(fields);

        let response = self.store.update(E::COLLECTION, vec![record]).await?;
        let updated = self.first_written(response, default)?;
        tracing::info!(collection = E::COLLECTION, id, "record updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: RecordId) -> Result<()> {
        self.delete_many(vec![id]).await
    }

    /// Deletes all `ids` in one bulk call. Any failed entry fails the call.
    pub async fn delete_many(&self, ids: Vec<RecordId>) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let default = format!("Failed to delete {}", lower(E::LABEL));
        let count = ids.len();

        let response = self.store.delete(E::COLLECTION, ids).await?;
        check_bulk(E::COLLECTION, response, &default)?;
        tracing::info!(collection = E::COLLECTION, count, "records deleted");
        Ok(())
    }

    fn first_written(&self, response: WriteResponse, default: &str) -> Result<E> {
        let results = check_bulk(E::COLLECTION, response, default)?;
        let record = results
            .into_iter()
            .find_map(|r| r.data)
            .ok_or_else(|| Error::backend(None, default))?;
        E::decode(&record, self.mode)
    }
}

impl<E: BoardEntity> Gateway<E> {
    /// Moves `id` to `key`, sending only the key field(s) and the id.
    pub async fn set_key(&self, id: RecordId, key: E::Key) -> Result<E> {
        let default = format!("Failed to update {}", E::KEY_NOUN);
        self.write_fields(id, E::key_patch(key), &default).await
    }

    pub async fn list_by_key(&self, key: E::Key) -> Result<Vec<E>> {
        let all = self.list().await?;
        Ok(all.into_iter().filter(|e| e.key() == key).collect())
    }
}

/// Applies the bulk-write rule: a top-level failure or any failed entry fails
/// the whole call with the first available message.
fn check_bulk(
    collection: &str,
    response: WriteResponse,
    default: &str,
) -> Result<Vec<WriteResult>> {
    if !response.success {
        tracing::error!(collection, message = ?response.message, "write rejected");
        return Err(Error::backend(response.message, default));
    }
    let results = response.results.unwrap_or_default();
    if let Some(failed) = results.iter().find(|r| !r.success) {
        let failures = results.iter().filter(|r| !r.success).count();
        tracing::error!(collection, failures, message = ?failed.message, "bulk write partially failed");
        return Err(Error::bulk(failed.message.clone(), default));
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_check_reports_first_failure() {
        let response = WriteResponse {
            success: true,
            results: Some(vec![
                WriteResult {
                    success: true,
                    ..WriteResult::default()
                },
                WriteResult {
                    success: false,
                    message: Some("row locked".into()),
                    ..WriteResult::default()
                },
                WriteResult {
                    success: false,
                    message: Some("second".into()),
                    ..WriteResult::default()
                },
            ]),
            message: None,
        };
        let err = check_bulk("task_c", response, "Failed to delete task").unwrap_err();
        assert!(matches!(&err, Error::BulkWrite { message } if message == "row locked"));
    }

    #[test]
    fn bulk_check_uses_default_without_message() {
        let response = WriteResponse {
            success: false,
            results: None,
            message: None,
        };
        let err = check_bulk("quote_c", response, "Failed to create quote").unwrap_err();
        assert_eq!(err.to_string(), "Failed to create quote");
    }
}
