//! The record-oriented backend contract.
//!
//! The remote service exposes every entity as a named collection of flat
//! records. [`RecordStore`] is the seam between the typed gateways and
//! whatever actually talks to the service: the HTTP client in the binary, or
//! [`InMemoryStore`] in tests.

mod memory;

pub use memory::{Call, InMemoryStore, Operation};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Primary key assigned by the backend.
pub type RecordId = i64;

/// A raw backend record. Custom fields are suffixed `_c`; `Id` is the key.
pub type Record = serde_json::Map<String, Value>;

pub const ID_FIELD: &str = "Id";

/// Field selector, serialized as `{"field": {"Name": "..."}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub field: FieldName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldName {
    #[serde(rename = "Name")]
    pub name: String,
}

impl Field {
    pub fn named(name: &str) -> Self {
        Self {
            field: FieldName {
                name: name.to_string(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.field.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    EqualTo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Condition {
    pub field_name: String,
    pub operator: Operator,
    pub values: Vec<Value>,
}

impl Condition {
    pub fn equal_to(field: &str, value: impl Into<Value>) -> Self {
        Self {
            field_name: field.to_string(),
            operator: Operator::EqualTo,
            values: vec![value.into()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortType {
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    #[serde(rename = "fieldName")]
    pub field_name: String,
    #[serde(rename = "sorttype")]
    pub sort_type: SortType,
}

impl OrderBy {
    pub fn desc(field: &str) -> Self {
        Self {
            field_name: field.to_string(),
            sort_type: SortType::Desc,
        }
    }
}

/// Parameters of a collection fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub fields: Vec<Field>,
    #[serde(rename = "where", default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(rename = "orderBy", default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderBy>,
}

impl Query {
    pub fn select(fields: &[&str]) -> Self {
        Self {
            fields: fields.iter().map(|f| Field::named(f)).collect(),
            ..Self::default()
        }
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn order(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<Vec<Record>>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<Record>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Outcome of one record inside a bulk write.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WriteResult {
    pub success: bool,
    #[serde(default)]
    pub data: Option<Record>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response shape shared by create, update and delete.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WriteResponse {
    pub success: bool,
    #[serde(default)]
    pub results: Option<Vec<WriteResult>>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordsPayload {
    pub records: Vec<Record>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletePayload {
    #[serde(rename = "RecordIds")]
    pub record_ids: Vec<RecordId>,
}

/// Get/create/update/delete by collection name.
///
/// Implementations return `Err` only when the call itself could not be made
/// or its answer could not be read. Failures the backend reports are carried
/// in the response's `success` flags and interpreted by the gateway.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn fetch(&self, collection: &str, query: &Query) -> Result<FetchResponse>;

    async fn get_by_id(
        &self,
        collection: &str,
        id: RecordId,
        fields: &[Field],
    ) -> Result<GetResponse>;

    async fn create(&self, collection: &str, records: Vec<Record>) -> Result<WriteResponse>;

    async fn update(&self, collection: &str, records: Vec<Record>) -> Result<WriteResponse>;

    async fn delete(&self, collection: &str, ids: Vec<RecordId>) -> Result<WriteResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_serializes_in_backend_shape() {
        let query = Query::select(&["Name", "stage_c"])
            .filter(Condition::equal_to("project_id_c", 4))
            .order(OrderBy::desc("Id"));

        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({
                "fields": [{"field": {"Name": "Name"}}, {"field": {"Name": "stage_c"}}],
                "where": [{"FieldName": "project_id_c", "Operator": "EqualTo", "Values": [4]}],
                "orderBy": [{"fieldName": "Id", "sorttype": "DESC"}]
            })
        );
    }

    #[test]
    fn empty_clauses_are_omitted() {
        let value = serde_json::to_value(Query::select(&["Name"])).unwrap();
        assert!(value.get("where").is_none());
        assert!(value.get("orderBy").is_none());
    }

    #[test]
    fn write_response_tolerates_missing_results() {
        let response: WriteResponse =
            serde_json::from_value(json!({"success": false, "message": "denied"})).unwrap();
        assert!(!response.success);
        assert!(response.results.is_none());
        assert_eq!(response.message.as_deref(), Some("denied"));
    }

    #[test]
    fn delete_payload_uses_record_ids_key() {
        let payload = DeletePayload {
            record_ids: vec![3, 9],
        };
        assert_eq!(
            serde_json::to_value(payload).unwrap(),
            json!({"RecordIds": [3, 9]})
        );
    }
}
