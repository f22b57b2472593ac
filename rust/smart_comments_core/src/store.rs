//! Client side of the comment store protocol.
//!
//! [`CommentStore`] is the operation-level interface the controller talks to.
//! [`HttpCommentStore`] implements it on top of a [`Transport`], which is the
//! only piece that differs between the browser and tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::comments::{CommentId, Snapshot};
use crate::config::WidgetConfig;
use crate::error::StoreError;

/// Query sent with fetch-all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchAllRequest {
    #[serde(rename = "fileID")]
    pub file_id: String,
}

/// Starts a new series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSeriesRequest {
    pub body: String,
    pub name: String,
    #[serde(rename = "fileID")]
    pub file_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyRequest {
    pub parent: CommentId,
    pub body: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub id: CommentId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyRequest {
    pub id: CommentId,
    pub to_email: String,
}

/// Acknowledgement payload. Only success or failure matters to the caller.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ack(pub Value);

/// The five remote operations. Each call resolves exactly once; nothing is
/// retried and no timeout is imposed here.
#[async_trait(?Send)]
pub trait CommentStore {
    /// Read-only and safe to repeat.
    async fn fetch_all(&self, request: FetchAllRequest) -> Result<Snapshot, StoreError>;

    /// Not idempotent: submitting twice creates two series.
    async fn create_series(&self, request: NewSeriesRequest) -> Result<Ack, StoreError>;

    /// Not idempotent.
    async fn reply(&self, request: ReplyRequest) -> Result<Ack, StoreError>;

    /// Deleting an already deleted comment is the store's concern.
    async fn delete(&self, request: DeleteRequest) -> Result<Ack, StoreError>;

    async fn notify(&self, request: NotifyRequest) -> Result<Ack, StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// A request ready for the wire: parameters go to the query string for GET
/// and to a form-encoded body for POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRequest {
    pub method: Method,
    pub url: String,
    pub params: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreResponse {
    pub status: u16,
    pub body: String,
}

impl StoreResponse {
    pub fn is_success(&self) -> bool { (200..300).contains(&self.status) }
}

/// Moves a [`StoreRequest`] over the network.
#[async_trait(?Send)]
pub trait Transport {
    async fn send(&self, request: StoreRequest) -> Result<StoreResponse, StoreError>;
}

/// Operation endpoints, one URL each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub fetch_all: String,
    pub new_series: String,
    pub reply: String,
    pub delete: String,
    pub notify: String,
}

impl From<&WidgetConfig> for Endpoints {
    fn from(config: &WidgetConfig) -> Self {
        Self {
            fetch_all: config.fetch_all_url.clone(),
            new_series: config.new_series_url.clone(),
            reply: config.reply_url.clone(),
            delete: config.delete_url.clone(),
            notify: config.notify_url.clone(),
        }
    }
}

/// HTTP flavour of the store protocol.
pub struct HttpCommentStore<T> {
    endpoints: Endpoints,
    transport: T,
}

impl<T: Transport> HttpCommentStore<T> {
    pub fn new(endpoints: Endpoints, transport: T) -> Self { Self { endpoints, transport } }

    pub fn transport(&self) -> &T { &self.transport }

    async fn call<P: Serialize>(&self, method: Method, url: &str, payload: &P) -> Result<String, StoreError> {
        let request = StoreRequest { method, url: url.to_string(), params: form_params(payload)? };
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(StoreError::Status { status: response.status, detail: response.body });
        }
        Ok(response.body)
    }

    async fn post<P: Serialize>(&self, url: &str, payload: &P) -> Result<Ack, StoreError> {
        let body = self.call(Method::Post, url, payload).await?;
        let ack = parse_ack(&body)?;
        debug!(url, ack = %ack.0, "store acknowledged");
        Ok(ack)
    }
}

#[async_trait(?Send)]
impl<T: Transport> CommentStore for HttpCommentStore<T> {
    async fn fetch_all(&self, request: FetchAllRequest) -> Result<Snapshot, StoreError> {
        let body = self.call(Method::Get, &self.endpoints.fetch_all, &request).await?;
        serde_json::from_str(&body).map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn create_series(&self, request: NewSeriesRequest) -> Result<Ack, StoreError> {
        self.post(&self.endpoints.new_series, &request).await
    }

    async fn reply(&self, request: ReplyRequest) -> Result<Ack, StoreError> {
        self.post(&self.endpoints.reply, &request).await
    }

    async fn delete(&self, request: DeleteRequest) -> Result<Ack, StoreError> {
        self.post(&self.endpoints.delete, &request).await
    }

    async fn notify(&self, request: NotifyRequest) -> Result<Ack, StoreError> {
        self.post(&self.endpoints.notify, &request).await
    }
}

/// Flattens a payload struct into ordered form parameters.
fn form_params<P: Serialize>(payload: &P) -> Result<Vec<(String, String)>, StoreError> {
    let value = serde_json::to_value(payload).map_err(|e| StoreError::Encode(e.to_string()))?;
    let Value::Object(map) = value else {
        return Err(StoreError::Encode("payload is not an object".into()));
    };
    Ok(map
        .into_iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (k, v)
        })
        .collect())
}

fn parse_ack(body: &str) -> Result<Ack, StoreError> {
    if body.trim().is_empty() {
        return Ok(Ack::default());
    }
    serde_json::from_str(body).map(Ack).map_err(|e| StoreError::Decode(e.to_string()))
}
