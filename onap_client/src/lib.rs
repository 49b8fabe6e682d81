//! Client for the HTTP APIs of ONAP components
//!
//! The [`Client`] type talks to a single ONAP service over HTTP and is the default
//! [`Transport`] used by the higher level wrappers in this crate, e.g., the A&AI bulk
//! submission engine in [`aai::bulk`].
pub mod aai;

use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use observability_deps::tracing::debug;
use reqwest::{
    IntoUrl, Method, StatusCode,
    header::{ACCEPT, CONTENT_TYPE},
};
use secrecy::{ExposeSecret, Secret};
use url::Url;
use uuid::Uuid;

use crate::aai::bulk::{AaiBulk, AaiBulkConfig};

/// The default value sent in the `X-FromAppId` header
pub const DEFAULT_FROM_APP_ID: &str = "AAI";

/// Primary error type for the [`Client`]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("base URL error: {0}")]
    BaseUrl(#[source] reqwest::Error),

    #[error("request URL error: {0}")]
    RequestUrl(#[from] url::ParseError),

    #[error("failed to build the HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("failed to read the API response bytes: {0}")]
    Bytes(#[source] reqwest::Error),

    #[error("failed to parse plaintext response: {0}")]
    Text(#[source] reqwest::Error),

    #[error("failed to encode or decode JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("server responded with error [{code}]: {message}")]
    ApiError { code: StatusCode, message: String },

    #[error("failed to send {method} {url} request: {source}")]
    RequestSend {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl Error {
    fn request_send(method: Method, url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::RequestSend {
            method,
            url: url.into(),
            source,
        }
    }

    /// The raw response body of an [`Error::ApiError`]
    pub fn response_text(&self) -> Option<&str> {
        match self {
            Self::ApiError { message, .. } => Some(message),
            _ => None,
        }
    }

    /// The HTTP status code of an [`Error::ApiError`]
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::ApiError { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether the server answered with a non-success status, as opposed to the request
    /// failing before a response was received or the response being unreadable
    pub fn is_api_error(&self) -> bool {
        matches!(self, Self::ApiError { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Sends a single request to an ONAP service
///
/// Implementations resolve `path` against their own base URL. A non-success response must be
/// reported as [`Error::ApiError`] carrying the response text so that callers can inspect it.
#[async_trait]
pub trait Transport: Debug + Send + Sync {
    /// Send a `method` request to `path` with an optional JSON `body`, returning the raw bytes
    /// of a successful response
    ///
    /// The `description` is a human readable summary of the request, used for logging.
    async fn send(
        &self,
        method: Method,
        description: &str,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Bytes>;
}

/// The ONAP HTTP client
///
/// For programmatic access to the REST API of a single ONAP component, e.g., A&AI
#[derive(Debug, Clone)]
pub struct Client {
    /// The base URL for making requests to the ONAP component
    base_url: Url,
    /// Username and password sent as HTTP basic auth on each request
    basic_auth: Option<(String, Secret<String>)>,
    /// Value of the `X-FromAppId` header sent on each request
    from_app_id: String,
    /// A [`reqwest::Client`] for handling HTTP requests
    http_client: reqwest::Client,
}

impl Client {
    /// Create a new [`Client`]
    pub fn new<U: IntoUrl>(base_url: U) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into_url().map_err(Error::BaseUrl)?,
            basic_auth: None,
            from_app_id: DEFAULT_FROM_APP_ID.to_string(),
            http_client: reqwest::Client::new(),
        })
    }

    /// Set the username and password sent as HTTP basic auth with each request
    ///
    /// # Example
    /// ```
    /// # use onap_client::Client;
    /// # fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    /// let client = Client::new("https://aai.api.sparky.simpledemo.onap.org:30233")?
    ///     .with_basic_auth("AAI", "AAI");
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.basic_auth = Some((username.into(), Secret::new(password.into())));
        self
    }

    /// Set the `X-FromAppId` header sent with each request
    pub fn with_from_app_id(mut self, from_app_id: impl Into<String>) -> Self {
        self.from_app_id = from_app_id.into();
        self
    }

    /// Set a timeout covering each request from connect until the response body is read
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::HttpClient)?;
        Ok(self)
    }

    /// The base URL requests are made against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Create an A&AI bulk submission engine that sends its requests through this client
    ///
    /// # Example
    /// ```no_run
    /// # use futures::TryStreamExt;
    /// # use onap_client::Client;
    /// # use onap_client::aai::bulk::{AaiBulkConfig, BulkOperation};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    /// let client = Client::new("https://aai.api.sparky.simpledemo.onap.org:30233")?
    ///     .with_basic_auth("AAI", "AAI");
    /// let mut bulk = client.aai_bulk(AaiBulkConfig::default());
    /// let outcomes: Vec<_> = bulk
    ///     .submit_default([BulkOperation::new(
    ///         "put",
    ///         "/cloud-infrastructure/complexes/complex/my-complex",
    ///         Default::default(),
    ///     )])
    ///     .try_collect()
    ///     .await?;
    /// for failed in bulk.failed_operations() {
    ///     println!("dropped {} {}", failed.action(), failed.uri());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn aai_bulk(&self, config: AaiBulkConfig) -> AaiBulk<Self> {
        AaiBulk::new(self.clone(), config)
    }
}

#[async_trait]
impl Transport for Client {
    async fn send(
        &self,
        method: Method,
        description: &str,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Bytes> {
        let url = self.base_url.join(path)?;
        debug!(%method, %url, description, "sending request");

        let mut req = self
            .http_client
            .request(method.clone(), url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header("X-FromAppId", &self.from_app_id)
            .header("X-TransactionId", Uuid::new_v4().to_string());
        if let Some((username, password)) = &self.basic_auth {
            req = req.basic_auth(username, Some(password.expose_secret()));
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req
            .send()
            .await
            .map_err(|src| Error::request_send(method, path, src))?;

        let status = resp.status();
        if status.is_success() {
            resp.bytes().await.map_err(Error::Bytes)
        } else {
            debug!(%status, description, "request rejected");
            Err(Error::ApiError {
                code: status,
                message: resp.text().await.map_err(Error::Text)?,
            })
        }
    }
}
