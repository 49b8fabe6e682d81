//! Submit many A&AI writes through the bulk API
//!
//! A&AI accepts a bounded number of operations per bulk request and processes each request as
//! a single transaction: one bad operation rejects the whole request. [`AaiBulk`] splits an
//! arbitrarily long sequence of [`BulkOperation`]s into chunks of at most
//! [`AaiBulkConfig::chunk_size`] operations and submits them one chunk at a time.
//!
//! When A&AI rejects a chunk and its error names the offending operation, that operation is
//! moved to [`AaiBulk::failed_operations`] and the rest of the chunk is submitted again. Only
//! one operation is removed per round trip, since A&AI numbers operations relative to the
//! request it received.
use std::{fmt::Display, num::NonZeroUsize, str::FromStr};

use futures::stream::{self, BoxStream, StreamExt};
use observability_deps::tracing::{debug, info, warn};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::{Result, Transport, aai::api_path};

mod operation_index;

pub use operation_index::failed_operation_index;

/// The number of operations sent per bulk request when none is configured
pub const DEFAULT_CHUNK_SIZE: NonZeroUsize = NonZeroUsize::new(30).unwrap();

/// The type returned by [`AaiBulk::submit`]
pub type OutcomeStream<'a> = BoxStream<'a, Result<BulkOutcome>>;

/// A single write to be carried out as part of a bulk request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkOperation {
    action: String,
    uri: String,
    #[serde(default)]
    body: serde_json::Map<String, serde_json::Value>,
}

impl BulkOperation {
    /// Create a new [`BulkOperation`]
    ///
    /// The `action` is the verb A&AI should apply, e.g., `put`, `patch` or `delete`, and `uri`
    /// the resource path relative to the versioned A&AI prefix.
    pub fn new(
        action: impl Into<String>,
        uri: impl Into<String>,
        body: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            action: action.into(),
            uri: uri.into(),
            body,
        }
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn body(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.body
    }
}

/// The acknowledgment of one operation in a successful bulk request
///
/// The fields are copied from the response and may differ from what was requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOutcome {
    pub action: String,
    pub uri: String,
    #[serde(rename = "response-status-code")]
    pub status_code: u16,
    #[serde(rename = "response-body", default)]
    pub body: Option<String>,
}

/// Body of a bulk request
#[derive(Debug, Serialize)]
struct BulkRequest<'a> {
    operations: &'a [BulkOperation],
}

/// Body of a successful bulk response
#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(rename = "operation-responses")]
    operation_responses: Vec<BulkOutcome>,
}

/// Which of the A&AI bulk APIs requests are sent to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BulkEndpoint {
    /// `/aai/<version>/bulk`
    #[default]
    Bulk,
    /// `/aai/<version>/bulk/single-transaction`
    SingleTransaction,
}

impl BulkEndpoint {
    fn resource(&self) -> &'static str {
        match self {
            Self::Bulk => "bulk",
            Self::SingleTransaction => "bulk/single-transaction",
        }
    }
}

impl Display for BulkEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bulk => write!(f, "bulk"),
            Self::SingleTransaction => write!(f, "single-transaction"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0} is not a valid bulk endpoint, values are bulk and single-transaction")]
pub struct ParseBulkEndpointError(String);

impl FromStr for BulkEndpoint {
    type Err = ParseBulkEndpointError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "bulk" => Ok(Self::Bulk),
            "single-transaction" | "single_transaction" => Ok(Self::SingleTransaction),
            _ => Err(ParseBulkEndpointError(s.into())),
        }
    }
}

/// Settings of an [`AaiBulk`] engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AaiBulkConfig {
    /// The A&AI REST API version, e.g., `v27`
    pub api_version: String,
    /// The maximum number of operations per request
    pub chunk_size: NonZeroUsize,
    /// The bulk API requests are sent to
    pub endpoint: BulkEndpoint,
}

impl Default for AaiBulkConfig {
    fn default() -> Self {
        Self {
            api_version: super::DEFAULT_API_VERSION.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            endpoint: BulkEndpoint::default(),
        }
    }
}

impl AaiBulkConfig {
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: NonZeroUsize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_endpoint(mut self, endpoint: BulkEndpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// The path bulk requests are sent to
    pub fn path(&self) -> String {
        api_path(&self.api_version, self.endpoint.resource())
    }
}

/// Submits [`BulkOperation`]s to A&AI in chunks, dropping operations that A&AI rejects
///
/// Operations dropped by any call to [`submit`][Self::submit] accumulate in
/// [`failed_operations`][Self::failed_operations], in the order they were found.
#[derive(Debug)]
pub struct AaiBulk<T> {
    transport: T,
    config: AaiBulkConfig,
    failed_operations: Vec<BulkOperation>,
}

impl<T: Transport> AaiBulk<T> {
    /// Create a new [`AaiBulk`] that sends requests through `transport`
    pub fn new(transport: T, config: AaiBulkConfig) -> Self {
        Self {
            transport,
            config,
            failed_operations: Vec::new(),
        }
    }

    pub fn config(&self) -> &AaiBulkConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The operations removed from rejected requests so far
    pub fn failed_operations(&self) -> &[BulkOperation] {
        &self.failed_operations
    }

    /// Submit `operations` with failed operations removed and retried without them
    ///
    /// Equivalent to `submit(operations, true)`.
    pub fn submit_default<'a, I>(&'a mut self, operations: I) -> OutcomeStream<'a>
    where
        I: IntoIterator<Item = BulkOperation>,
        I::IntoIter: Send + 'a,
    {
        self.submit(operations, true)
    }

    /// Submit `operations`, yielding the outcome of each accepted operation
    ///
    /// The returned stream is lazy: a chunk is only taken from `operations` and sent once the
    /// outcomes of the previous chunk have been consumed. Within a chunk, outcomes are yielded
    /// in the order A&AI returned them.
    ///
    /// If `remove_failed_operation_on_failure` is set and A&AI names the operation that made it
    /// reject a chunk, that operation is moved to
    /// [`failed_operations`][Self::failed_operations] and the rest of the chunk is sent again.
    /// Any other error is yielded as-is and ends the stream; outcomes yielded before it remain
    /// valid.
    pub fn submit<'a, I>(
        &'a mut self,
        operations: I,
        remove_failed_operation_on_failure: bool,
    ) -> OutcomeStream<'a>
    where
        I: IntoIterator<Item = BulkOperation>,
        I::IntoIter: Send + 'a,
    {
        let state = SubmitState {
            bulk: self,
            operations: operations.into_iter(),
            pending: Vec::new().into_iter(),
            remove_failed_operation_on_failure,
        };
        stream::try_unfold(state, SubmitState::next).boxed()
    }

    /// Send one chunk, removing a failed operation and resending the remainder until the chunk
    /// is accepted, runs empty, or fails in a way that can't be pinned on one operation
    async fn send_chunk(
        &mut self,
        mut chunk: Vec<BulkOperation>,
        remove_failed_operation_on_failure: bool,
    ) -> Result<Vec<BulkOutcome>> {
        let path = self.config.path();
        loop {
            if chunk.is_empty() {
                debug!("no operations left to send in chunk");
                return Ok(Vec::new());
            }

            let body = serde_json::to_value(BulkRequest {
                operations: &chunk,
            })?;
            debug!(operations = chunk.len(), %path, "sending bulk request");
            let error = match self
                .transport
                .send(Method::POST, "Send bulk A&AI request", &path, Some(body))
                .await
            {
                Ok(bytes) => {
                    let response: BulkResponse = serde_json::from_slice(&bytes)?;
                    return Ok(response.operation_responses);
                }
                Err(error) => error,
            };

            if !remove_failed_operation_on_failure || !error.is_api_error() {
                return Err(error);
            }

            let failed_index = failed_operation_index(error.response_text());
            match failed_index {
                Some(index) if index < chunk.len() => {
                    let operation = chunk.remove(index);
                    info!(
                        index,
                        action = %operation.action,
                        uri = %operation.uri,
                        remaining = chunk.len(),
                        "removing failed operation from bulk request"
                    );
                    self.failed_operations.push(operation);
                }
                Some(index) => {
                    warn!(
                        index,
                        operations = chunk.len(),
                        "failed operation index is out of range, unable to remove it"
                    );
                    return Err(error);
                }
                None => {
                    warn!(%error, "unable to determine which operation failed");
                    return Err(error);
                }
            }
        }
    }
}

/// State threaded through the stream returned by [`AaiBulk::submit`]
struct SubmitState<'a, T, I> {
    bulk: &'a mut AaiBulk<T>,
    operations: I,
    /// Outcomes of the last chunk not yet yielded
    pending: std::vec::IntoIter<BulkOutcome>,
    remove_failed_operation_on_failure: bool,
}

impl<T, I> SubmitState<'_, T, I>
where
    T: Transport,
    I: Iterator<Item = BulkOperation> + Send,
{
    async fn next(mut self) -> Result<Option<(BulkOutcome, Self)>> {
        loop {
            if let Some(outcome) = self.pending.next() {
                return Ok(Some((outcome, self)));
            }

            let chunk: Vec<_> = self
                .operations
                .by_ref()
                .take(self.bulk.config.chunk_size.get())
                .collect();
            if chunk.is_empty() {
                return Ok(None);
            }
            self.pending = self
                .bulk
                .send_chunk(chunk, self.remove_failed_operation_on_failure)
                .await?
                .into_iter();
        }
    }
}
