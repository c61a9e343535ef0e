use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use todo_shared::{ChangeEvent, ChangeKind};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::{ChangeFeed, NewTodoRow, StoreError, TodoPatch, TodoRow, TodoStore, UNIQUE_VIOLATION};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const RETURN_REPRESENTATION: &str = "return=representation";

/// Client for a hosted Postgres exposed through PostgREST (`/rest/v1`).
#[derive(Debug, Clone)]
pub struct PostgrestStore {
    client: Client,
    table_url: Url,
    feed: ChangeFeed,
}

/// Error body PostgREST returns for failed requests.
#[derive(Debug, Default, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

impl PostgrestStore {
    /// Builds the HTTP client. No request is made until the first query.
    pub fn connect(base_url: &Url, api_key: &str, table: &str) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key)
            .map_err(|_| StoreError::InvalidConfig("access key is not a valid header value".into()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| StoreError::InvalidConfig("access key is not a valid header value".into()))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            table_url: table_url(base_url, table)?,
            feed: ChangeFeed::new(),
        })
    }

    fn url_for(&self, id: Option<Uuid>, order: bool) -> Url {
        let mut url = self.table_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("select", "*");
            if let Some(id) = id {
                query.append_pair("id", &format!("eq.{id}"));
            }
            if order {
                query.append_pair("order", "created_at.desc");
            }
        }
        url
    }

    async fn rows(&self, request: RequestBuilder) -> Result<Vec<TodoRow>, StoreError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status, &body));
        }
        response
            .json::<Vec<TodoRow>>()
            .await
            .map_err(|err| StoreError::Decode(err.to_string()))
    }
}

fn table_url(base: &Url, table: &str) -> Result<Url, StoreError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(&format!("rest/v1/{table}"))
        .map_err(|err| StoreError::InvalidConfig(err.to_string()))
}

fn classify_error(status: StatusCode, body: &str) -> StoreError {
    let parsed: PostgrestError = serde_json::from_str(body).unwrap_or_default();
    let message = match (parsed.message, parsed.details) {
        (Some(message), Some(details)) => format!("{message} ({details})"),
        (Some(message), None) => message,
        (None, _) if !body.is_empty() => body.to_string(),
        (None, _) => status.to_string(),
    };

    if parsed.code.as_deref() == Some(UNIQUE_VIOLATION) || status == StatusCode::CONFLICT {
        return StoreError::UniqueViolation(message);
    }
    StoreError::Rejected {
        status: status.as_u16(),
        code: parsed.code,
        message,
    }
}

#[async_trait]
impl TodoStore for PostgrestStore {
    async fn list(&self) -> Result<Vec<TodoRow>, StoreError> {
        self.rows(self.client.get(self.url_for(None, true))).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<TodoRow>, StoreError> {
        let rows = self.rows(self.client.get(self.url_for(Some(id), false))).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, row: NewTodoRow) -> Result<TodoRow, StoreError> {
        let request = self
            .client
            .post(self.url_for(None, false))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&row);
        let created = self
            .rows(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode("insert returned no row".into()))?;
        self.feed.publish(ChangeKind::Insert, created.id);
        Ok(created)
    }

    async fn update(&self, id: Uuid, patch: TodoPatch) -> Result<Option<TodoRow>, StoreError> {
        let request = self
            .client
            .patch(self.url_for(Some(id), false))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&patch);
        let updated = self.rows(request).await?.into_iter().next();
        if updated.is_some() {
            self.feed.publish(ChangeKind::Update, id);
        }
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let request = self
            .client
            .delete(self.url_for(Some(id), false))
            .header("Prefer", RETURN_REPRESENTATION);
        let removed = self.rows(request).await?;
        if !removed.is_empty() {
            self.feed.publish(ChangeKind::Delete, id);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe()
    }
}
