//! PostgrestStore - hosted backend の REST API（`{url}/rest/v1/{table}`）
//!
//! - select: `GET ?select=*&order=id.asc&limit=N`
//! - insert: `POST` JSON 配列, `Prefer: return=minimal`
//! - delete: `DELETE ?id=in.(a,b,c)`
//!
//! クライアントはこの struct が所有する。drop すればコネクションプールも解放される。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};

use crate::config::{ConfigError, Secret};
use crate::domain::{LiveRecord, RecordId, StagingRecord};
use crate::error::StoreError;
use crate::ports::TableStore;

pub struct PostgrestStore {
    client: Client,
    rest_base: Url,
    service_key: Secret,
}

impl PostgrestStore {
    pub fn new(
        endpoint: &str,
        service_key: Secret,
        timeout: Option<Duration>,
    ) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidUrl {
            url: endpoint.to_string(),
            reason: reason.to_string(),
        };

        let mut rest_base = Url::parse(endpoint).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(rest_base.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        rest_base
            .path_segments_mut()
            .map_err(|_| invalid("cannot be a base url"))?
            .pop_if_empty()
            .extend(["rest", "v1"]);

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(ConfigError::HttpClient)?;

        Ok(Self {
            client,
            rest_base,
            service_key,
        })
    }

    fn table_url(&self, table: &str) -> Url {
        let mut url = self.rest_base.clone();
        // rest_base は new() で base URL であることを確認済み
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(table);
        }
        url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let key = self.service_key.expose();
        request
            .header("apikey", key)
            .header("Authorization", format!("Bearer {key}"))
    }

    async fn check(table: &str, response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::TableNotFound(table.to_string()));
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

/// `id=in.(...)` filter value for a delete.
fn id_filter(ids: &[RecordId]) -> String {
    let joined = ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("in.({joined})")
}

#[async_trait]
impl TableStore for PostgrestStore {
    async fn select_oldest(
        &self,
        table: &str,
        limit: usize,
    ) -> Result<Vec<StagingRecord>, StoreError> {
        tracing::debug!(table, limit, "select oldest rows");
        let request = self.client.get(self.table_url(table)).query(&[
            ("select", "*".to_string()),
            ("order", "id.asc".to_string()),
            ("limit", limit.to_string()),
        ]);
        let response = Self::check(table, self.authorized(request).send().await?).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn insert(&self, table: &str, rows: &[LiveRecord]) -> Result<(), StoreError> {
        tracing::debug!(table, rows = rows.len(), "insert rows");
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=minimal")
            .json(rows);
        Self::check(table, self.authorized(request).send().await?).await?;
        Ok(())
    }

    async fn delete_ids(&self, table: &str, ids: &[RecordId]) -> Result<(), StoreError> {
        tracing::debug!(table, ids = ids.len(), "delete rows by id");
        let request = self
            .client
            .delete(self.table_url(table))
            .query(&[("id", id_filter(ids))]);
        Self::check(table, self.authorized(request).send().await?).await?;
        Ok(())
    }
}
