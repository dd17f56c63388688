use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures::Stream;
use futures::stream::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::types::ChatRequest;

const DEFAULT_BASE_URL: &str = "http://localhost:5000/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const CHAT_PATH: &str = "chat";

/// A response body as it arrives: raw byte chunks in order.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Where a chat controller sends its questions.
///
/// `open` resolves once the response headers are in and hands back the body
/// for the stream reader to consume.
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    /// Issues `request` and returns the response body.
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream>;
}

/// HTTP client for the chat server.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
}

impl ChatClient {
    /// Create a client for the server at `base_url` with the default timeout.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_options(Some(base_url), None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(base_url: Option<&str>, timeout: Option<Duration>) -> Result<Self> {
        let mut base_url = Url::parse(base_url.unwrap_or(DEFAULT_BASE_URL))?;
        // Url::join replaces the last segment unless the path ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// The server this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The URL questions are posted to.
    pub fn chat_url(&self) -> Result<Url> {
        Ok(self.base_url.join(CHAT_PATH)?)
    }

    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/x-ndjson, text/event-stream"),
        );
        headers
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();

        // The server answers failures with the same record shape it streams.
        #[derive(Deserialize)]
        struct ErrorResponse {
            message: Option<String>,
            error: Option<String>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };

        let error_message = serde_json::from_str::<ErrorResponse>(&error_body)
            .ok()
            .and_then(|parsed| parsed.message.or(parsed.error))
            .unwrap_or_else(|| error_body.trim().to_string());

        match status_code {
            400 => Error::bad_request(error_message),
            404 => Error::not_found(error_message),
            408 => Error::timeout(error_message, None),
            500 => Error::internal_server(error_message),
            502..=504 => Error::service_unavailable(error_message),
            _ => Error::api(status_code, error_message),
        }
    }

    /// Post `request` and return the streaming response body.
    pub async fn stream(&self, request: &ChatRequest) -> Result<ByteStream> {
        CLIENT_REQUESTS.click();
        let url = self.chat_url()?;
        debug!(%url, chat_id = %request.chat_id, "posting chat request");

        let response = self
            .client
            .post(url)
            .headers(self.default_headers())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                if e.is_timeout() {
                    Error::timeout(
                        format!("Request timed out: {}", e),
                        Some(self.timeout.as_secs_f64()),
                    )
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
                }
            })?;

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }

        let stream = response.bytes_stream().map(|result| {
            result.map_err(|e| {
                Error::streaming(format!("Error in HTTP stream: {}", e), Some(Box::new(e)))
            })
        });
        Ok(Box::pin(stream))
    }
}

#[async_trait::async_trait]
impl ChatTransport for ChatClient {
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream> {
        self.stream(request).await
    }
}

/// Serves a recorded response body from disk, whatever the question.
///
/// Useful for checking how the client renders a captured server response.
#[derive(Debug, Clone)]
pub struct ReplayTransport {
    path: PathBuf,
}

impl ReplayTransport {
    /// Replays the newline-delimited JSON file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl ChatTransport for ReplayTransport {
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream> {
        debug!(path = %self.path.display(), chat_id = %request.chat_id, "replaying recorded response");
        let file = tokio::fs::File::open(&self.path).await.map_err(|err| {
            Error::io(
                format!("failed to open replay file {}", self.path.display()),
                err,
            )
        })?;
        let stream = ReaderStream::new(file).map(|result| result.map_err(Error::from));
        Ok(Box::pin(stream))
    }
}

/// Either transport, picked at startup.
pub enum AnyTransport {
    /// Live HTTP.
    Http(ChatClient),
    /// Recorded file.
    Replay(ReplayTransport),
}

#[async_trait::async_trait]
impl ChatTransport for AnyTransport {
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream> {
        match self {
            AnyTransport::Http(client) => client.open(request).await,
            AnyTransport::Replay(replay) => replay.open(request).await,
        }
    }
}
