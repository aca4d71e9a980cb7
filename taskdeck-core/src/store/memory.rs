use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use super::{
    Condition, Field, FetchResponse, GetResponse, Operator, Query, Record, RecordId,
    RecordStore, SortType, WriteResponse, WriteResult, ID_FIELD,
};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Fetch,
    GetById,
    Create,
    Update,
    Delete,
}

/// One request received by the store, kept for assertions.
#[derive(Debug, Clone)]
pub struct Call {
    pub operation: Operation,
    pub collection: String,
    pub records: Vec<Record>,
    pub ids: Vec<RecordId>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<RecordId, Record>>,
    next_id: RecordId,
    calls: Vec<Call>,
    failures: HashMap<Operation, String>,
    rejected: HashMap<(String, RecordId), String>,
}

/// A [`RecordStore`] that keeps every collection in memory.
///
/// Besides serving as a local backend it can be told to fail: a whole
/// operation with [`InMemoryStore::fail_next`], or a single record inside a
/// bulk write with [`InMemoryStore::reject_record`].
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a record directly, bypassing the call log. Returns its id.
    pub fn insert(&self, collection: &str, mut record: Record) -> RecordId {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        record.insert(ID_FIELD.to_string(), Value::from(id));
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id, record);
        id
    }

    pub fn records(&self, collection: &str) -> Vec<Record> {
        self.lock()
            .collections
            .get(collection)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Make the next `operation` answer `success: false` with `message`.
    pub fn fail_next(&self, operation: Operation, message: impl Into<String>) {
        self.lock().failures.insert(operation, message.into());
    }

    /// Make every bulk write touching `id` report a failed entry for it.
    pub fn reject_record(&self, collection: &str, id: RecordId, message: impl Into<String>) {
        self.lock()
            .rejected
            .insert((collection.to_string(), id), message.into());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn calls_for(&self, operation: Operation) -> Vec<Call> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }
}

impl Inner {
    fn record_call(
        &mut self,
        operation: Operation,
        collection: &str,
        records: Vec<Record>,
        ids: Vec<RecordId>,
    ) -> Option<String> {
        self.calls.push(Call {
            operation,
            collection: collection.to_string(),
            records,
            ids,
        });
        self.failures.remove(&operation)
    }

    fn rejection(&self, collection: &str, id: RecordId) -> Option<String> {
        self.rejected.get(&(collection.to_string(), id)).cloned()
    }
}

fn failed_write(message: String) -> WriteResponse {
    WriteResponse {
        success: false,
        results: None,
        message: Some(message),
    }
}

fn record_id(record: &Record) -> Option<RecordId> {
    record.get(ID_FIELD).and_then(Value::as_i64)
}

/// Lookup values may be references (`{"Id": 3, "Name": "..."}`) on the record side.
fn comparable(value: &Value) -> &Value {
    match value {
        Value::Object(map) => map.get(ID_FIELD).unwrap_or(value),
        other => other,
    }
}

fn matches(record: &Record, condition: &Condition) -> bool {
    let Some(value) = record.get(&condition.field_name) else {
        return false;
    };
    match condition.operator {
        Operator::EqualTo => condition
            .values
            .iter()
            .any(|expected| values_equal(comparable(value), expected)),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => a.to_string().cmp(&b.to_string()),
        },
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

fn project(record: &Record, fields: &[Field]) -> Record {
    if fields.is_empty() {
        return record.clone();
    }
    let mut out = Record::new();
    if let Some(id) = record.get(ID_FIELD) {
        out.insert(ID_FIELD.to_string(), id.clone());
    }
    for field in fields {
        if let Some(value) = record.get(field.name()) {
            out.insert(field.name().to_string(), value.clone());
        }
    }
    out
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn fetch(&self, collection: &str, query: &Query) -> Result<FetchResponse> {
        let mut inner = self.lock();
        if let Some(message) = inner.record_call(Operation::Fetch, collection, Vec::new(), Vec::new())
        {
            return Ok(FetchResponse {
                success: false,
                data: None,
                message: Some(message),
            });
        }

        let mut rows: Vec<&Record> = inner
            .collections
            .get(collection)
            .map(|records| {
                records
                    .values()
                    .filter(|r| query.conditions.iter().all(|c| matches(r, c)))
                    .collect()
            })
            .unwrap_or_default();

        for order in query.order_by.iter().rev() {
            rows.sort_by(|a, b| {
                let ord = compare(a.get(&order.field_name), b.get(&order.field_name));
                match order.sort_type {
                    SortType::Asc => ord,
                    SortType::Desc => ord.reverse(),
                }
            });
        }

        let data = rows.into_iter().map(|r| project(r, &query.fields)).collect();
        Ok(FetchResponse {
            success: true,
            data: Some(data),
            message: None,
        })
    }

    async fn get_by_id(
        &self,
        collection: &str,
        id: RecordId,
        fields: &[Field],
    ) -> Result<GetResponse> {
        let mut inner = self.lock();
        if let Some(message) = inner.record_call(Operation::GetById, collection, Vec::new(), vec![id])
        {
            return Ok(GetResponse {
                success: false,
                data: None,
                message: Some(message),
            });
        }

        let data = inner
            .collections
            .get(collection)
            .and_then(|records| records.get(&id))
            .map(|r| project(r, fields));
        Ok(GetResponse {
            success: true,
            data,
            message: None,
        })
    }

    async fn create(&self, collection: &str, records: Vec<Record>) -> Result<WriteResponse> {
        let mut inner = self.lock();
        if let Some(message) =
            inner.record_call(Operation::Create, collection, records.clone(), Vec::new())
        {
            return Ok(failed_write(message));
        }

        let mut results = Vec::with_capacity(records.len());
        for mut record in records {
            inner.next_id += 1;
            let id = inner.next_id;
            record.insert(ID_FIELD.to_string(), Value::from(id));
            inner
                .collections
                .entry(collection.to_string())
                .or_default()
                .insert(id, record.clone());
            results.push(WriteResult {
                success: true,
                data: Some(record),
                message: None,
            });
        }

        Ok(WriteResponse {
            success: true,
            results: Some(results),
            message: None,
        })
    }

    async fn update(&self, collection: &str, records: Vec<Record>) -> Result<WriteResponse> {
        let mut inner = self.lock();
        if let Some(message) =
            inner.record_call(Operation::Update, collection, records.clone(), Vec::new())
        {
            return Ok(failed_write(message));
        }

        let mut results = Vec::with_capacity(records.len());
        for record in records {
            let Some(id) = record_id(&record) else {
                results.push(WriteResult {
                    success: false,
                    data: None,
                    message: Some("Record Id is required".into()),
                });
                continue;
            };
            if let Some(message) = inner.rejection(collection, id) {
                results.push(WriteResult {
                    success: false,
                    data: None,
                    message: Some(message),
                });
                continue;
            }
            let stored = inner
                .collections
                .get_mut(collection)
                .and_then(|records| records.get_mut(&id));
            match stored {
                Some(stored) => {
                    for (key, value) in record {
                        stored.insert(key, value);
                    }
                    results.push(WriteResult {
                        success: true,
                        data: Some(stored.clone()),
                        message: None,
                    });
                }
                None => results.push(WriteResult {
                    success: false,
                    data: None,
                    message: Some(format!("Record {id} does not exist")),
                }),
            }
        }

        Ok(WriteResponse {
            success: true,
            results: Some(results),
            message: None,
        })
    }

    async fn delete(&self, collection: &str, ids: Vec<RecordId>) -> Result<WriteResponse> {
        let mut inner = self.lock();
        if let Some(message) =
            inner.record_call(Operation::Delete, collection, Vec::new(), ids.clone())
        {
            return Ok(failed_write(message));
        }

        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(message) = inner.rejection(collection, id) {
                results.push(WriteResult {
                    success: false,
                    data: None,
                    message: Some(message),
                });
                continue;
            }
            let removed = inner
                .collections
                .get_mut(collection)
                .and_then(|records| records.remove(&id));
            results.push(WriteResult {
                success: removed.is_some(),
                data: None,
                message: removed
                    .is_none()
                    .then(|| format!("Record {id} does not exist")),
            });
        }

        Ok(WriteResponse {
            success: true,
            results: Some(results),
            message: None,
        })
    }
}
