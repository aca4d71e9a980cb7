//! HTTP client for the remote record service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

use taskdeck_core::store::{
    DeletePayload, FetchResponse, Field, GetResponse, Query, Record, RecordId, RecordStore,
    RecordsPayload, WriteResponse,
};
use taskdeck_core::{Error, Result};

use crate::config::Config;

#[derive(Serialize)]
struct FieldsPayload<'a> {
    fields: &'a [Field],
}

fn transport(err: reqwest::Error) -> Error {
    Error::Transport(err.to_string())
}

/// [`RecordStore`] over the service's JSON API.
///
/// Every request is scoped to one project and authenticated with its public
/// key. Non-2xx answers are transport errors; `success: false` bodies are
/// returned as-is for the gateway to interpret.
#[derive(Clone)]
pub struct HttpRecordStore {
    http: Client,
    base_url: String,
    project_id: String,
    public_key: String,
}

impl HttpRecordStore {
    pub fn new(
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        public_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport)?;
        Ok(Self::with_client(http, base_url, project_id, public_key))
    }

    /// Uses a caller-configured client (proxy, TLS or timeout settings).
    pub fn with_client(
        http: Client,
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        public_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            public_key: public_key.into(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.backend_url.as_str(),
            config.project_id.as_str(),
            config.public_key.as_str(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: String) -> RequestBuilder {
        self.http
            .request(method, format!("{}/collections/{}", self.base_url, path))
            .header("X-Project-Id", &self.project_id)
            .bearer_auth(&self.public_key)
    }

    async fn send<B, R>(&self, method: Method, path: String, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        tracing::debug!(%method, path = %path, "backend request");
        let res = self
            .request(method, path)
            .json(body)
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;
        res.json().await.map_err(transport)
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn fetch(&self, collection: &str, query: &Query) -> Result<FetchResponse> {
        self.send(Method::POST, format!("{collection}/query"), query)
            .await
    }

    async fn get_by_id(
        &self,
        collection: &str,
        id: RecordId,
        fields: &[Field],
    ) -> Result<GetResponse> {
        self.send(
            Method::POST,
            format!("{collection}/records/{id}"),
            &FieldsPayload { fields },
        )
        .await
    }

    async fn create(&self, collection: &str, records: Vec<Record>) -> Result<WriteResponse> {
        self.send(
            Method::POST,
            format!("{collection}/records"),
            &RecordsPayload { records },
        )
        .await
    }

    async fn update(&self, collection: &str, records: Vec<Record>) -> Result<WriteResponse> {
        self.send(
            Method::PUT,
            format!("{collection}/records"),
            &RecordsPayload { records },
        )
        .await
    }

    async fn delete(&self, collection: &str, ids: Vec<RecordId>) -> Result<WriteResponse> {
        self.send(
            Method::DELETE,
            format!("{collection}/records"),
            &DeletePayload { record_ids: ids },
        )
        .await
    }
}
