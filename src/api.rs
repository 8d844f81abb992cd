//! Typed client for the Backlify HTTP API.
//!
//! Responses are decoded into crate types right here; callers never see raw
//! JSON for anything they read fields from.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{Schema, SchemaError, Table};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Unexpected schema in response: {0}")]
    Schema(#[from] SchemaError),
    #[error("Server rejected the request: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

/// Moves one JSON request to the server and returns the JSON reply
/// (`Value::Null` for an empty body).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateSchemaBody<'a> {
    prompt: &'a str,
    user_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ModifySchemaBody<'a> {
    prompt: &'a str,
    tables: Vec<Table>,
}

#[derive(Debug, Serialize)]
struct CreateApiBody {
    tables: Vec<Table>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedApi {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub api_id: Option<String>,
    #[serde(default)]
    pub tables: Option<Value>,
    #[serde(default)]
    pub endpoints: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSummary {
    #[serde(alias = "apiId", alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub table_count: Option<usize>,
    #[serde(default)]
    pub endpoint_count: Option<usize>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListingDoc {
    Bare(Vec<ApiSummary>),
    Wrapped { apis: Vec<ApiSummary> },
}

impl From<ListingDoc> for Vec<ApiSummary> {
    fn from(doc: ListingDoc) -> Self {
        match doc {
            ListingDoc::Bare(apis) | ListingDoc::Wrapped { apis } => apis,
        }
    }
}

pub struct ApiClient<T> {
    transport: T,
    token: Option<String>,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn send(&self, method: Method, path: String, body: Option<Value>) -> Result<Value, ApiError> {
        let request = ApiRequest {
            method,
            path,
            body,
            bearer: self.token.clone(),
        };
        tracing::debug!(method = ?request.method, path = %request.path, "api request");
        self.transport.send(request).await
    }

    pub async fn generate_schema(&self, prompt: &str, user_id: Option<&str>) -> Result<Schema, ApiError> {
        let body = serde_json::to_value(GenerateSchemaBody { prompt, user_id })?;
        let reply = self.send(Method::Post, "/generate-schema".to_string(), Some(body)).await?;
        let schema = Schema::from_value(reply)?;
        tracing::info!(tables = schema.tables.len(), "schema generated");
        Ok(schema)
    }

    pub async fn modify_schema(&self, prompt: &str, current: &Schema) -> Result<Schema, ApiError> {
        let body = serde_json::to_value(ModifySchemaBody {
            prompt,
            tables: current.tables_with_references(),
        })?;
        let reply = self.send(Method::Post, "/modify-schema".to_string(), Some(body)).await?;
        let schema = Schema::from_value(reply)?;
        tracing::info!(tables = schema.tables.len(), "schema modified");
        Ok(schema)
    }

    pub async fn create_api_from_schema(&self, schema: &Schema) -> Result<CreatedApi, ApiError> {
        let body = serde_json::to_value(CreateApiBody {
            tables: schema.tables_with_references(),
        })?;
        let reply = self
            .send(Method::Post, "/create-api-from-schema".to_string(), Some(body))
            .await?;
        let created: CreatedApi = serde_json::from_value(reply)?;
        match (created.success, created.api_id.as_deref()) {
            (true, Some(api_id)) => {
                tracing::info!(api_id = %api_id, "api created");
                Ok(created)
            }
            _ => Err(ApiError::Rejected(
                created
                    .message
                    .clone()
                    .unwrap_or_else(|| "API creation did not return an id".to_string()),
            )),
        }
    }

    pub async fn list_apis(&self) -> Result<Vec<ApiSummary>, ApiError> {
        let reply = self.send(Method::Get, "/my-apis".to_string(), None).await?;
        let listing: ListingDoc = serde_json::from_value(reply)?;
        Ok(listing.into())
    }

    pub async fn delete_api(&self, id: &str) -> Result<(), ApiError> {
        self.send(Method::Delete, format!("/api/{}", id), None).await?;
        tracing::info!(api_id = %id, "api deleted");
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use http::HttpTransport;

#[cfg(not(target_arch = "wasm32"))]
mod http {
    use async_trait::async_trait;
    use reqwest::Client;
    use serde::Deserialize;
    use serde_json::Value;

    use super::{ApiError, ApiRequest, Method, Transport};

    #[derive(Deserialize)]
    struct ErrorBody {
        #[serde(alias = "error")]
        message: String,
    }

    impl From<reqwest::Error> for ApiError {
        fn from(err: reqwest::Error) -> Self {
            match err.status() {
                Some(status) => ApiError::Status {
                    status: status.as_u16(),
                    message: err.to_string(),
                },
                None => ApiError::Transport(err.to_string()),
            }
        }
    }

    #[derive(Debug, Clone)]
    pub struct HttpTransport {
        client: Client,
        base_url: String,
    }

    impl HttpTransport {
        pub fn new(base_url: &str) -> Self {
            Self {
                client: Client::new(),
                base_url: base_url.trim_end_matches('/').to_string(),
            }
        }
    }

    #[async_trait]
    impl Transport for HttpTransport {
        async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
            let url = format!("{}{}", self.base_url, request.path);
            let mut builder = match request.method {
                Method::Get => self.client.get(&url),
                Method::Post => self.client.post(&url),
                Method::Delete => self.client.delete(&url),
            };
            if let Some(token) = &request.bearer {
                builder = builder.bearer_auth(token);
            }
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let resp = builder.send().await?;
            let status = resp.status();
            let text = resp.text().await?;

            if !status.is_success() {
                let message = serde_json::from_str::<ErrorBody>(&text)
                    .map(|b| b.message)
                    .unwrap_or_else(|_| status.canonical_reason().unwrap_or("error").to_string());
                return Err(ApiError::Status {
                    status: status.as_u16(),
                    message,
                });
            }

            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            Ok(serde_json::from_str(&text)?)
        }
    }
}
