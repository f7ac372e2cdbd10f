//! how a request reaches a shard holder
//!
//! the orchestrator only sees the [`Transport`] trait. [`HttpTransport`]
//! posts json over http (feature `http`); tests plug in their own.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::handshake::{RequestParams, ResponseMessage};

/// transport-level failure of one exchange
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// the holder answered, but not with a shard
    #[error("{error}")]
    Rejected { status: u16, error: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<TransportError> for crate::Error {
    fn from(e: TransportError) -> Self {
        use crate::Error as E;
        match e {
            // 403 carries the holder's handshake verdict
            TransportError::Rejected { status: 403, error } => match error.as_str() {
                "Invalid TOTP code" => E::InvalidCode,
                "Invalid signature" => E::InvalidSignature,
                _ => E::Rejected { status: 403, error },
            },
            TransportError::Rejected { status, error } => E::Rejected { status, error },
            TransportError::Network(detail) => E::NetworkError(detail),
            TransportError::Malformed(detail) => E::Serialization(detail),
        }
    }
}

/// what a holder sends back
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply {
    Message(ResponseMessage),
    Failure { error: String },
}

impl Reply {
    /// interpret a reply received with `status`
    pub fn into_result(self, status: u16) -> Result<ResponseMessage, TransportError> {
        match self {
            Reply::Message(message) if status == 200 => Ok(message),
            Reply::Message(_) => Err(TransportError::Rejected {
                status,
                error: format!("unexpected status {}", status),
            }),
            Reply::Failure { error } => Err(TransportError::Rejected { status, error }),
        }
    }
}

#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// deliver `params` to `endpoint` and return the holder's response
    ///
    /// the orchestrator wraps this in its own timeout and drops the future
    /// once enough shards are in hand, so implementations must be cancel
    /// safe: dropping mid-flight must leave nothing half-applied.
    async fn send(
        &self,
        endpoint: &str,
        params: &RequestParams,
    ) -> Result<ResponseMessage, TransportError>;
}

#[async_trait::async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(
        &self,
        endpoint: &str,
        params: &RequestParams,
    ) -> Result<ResponseMessage, TransportError> {
        (**self).send(endpoint, params).await
    }
}

#[cfg(feature = "http")]
pub use http::HttpTransport;

#[cfg(feature = "http")]
mod http {
    use super::*;

    /// json over http post
    #[derive(Clone, Debug, Default)]
    pub struct HttpTransport {
        http: reqwest::Client,
    }

    impl HttpTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_client(http: reqwest::Client) -> Self {
            Self { http }
        }
    }

    #[async_trait::async_trait]
    impl Transport for HttpTransport {
        async fn send(
            &self,
            endpoint: &str,
            params: &RequestParams,
        ) -> Result<ResponseMessage, TransportError> {
            let resp = self
                .http
                .post(endpoint)
                .json(params)
                .send()
                .await
                .map_err(|e| TransportError::Network(e.to_string()))?;

            let status = resp.status().as_u16();
            let bytes = resp
                .bytes()
                .await
                .map_err(|e| TransportError::Network(e.to_string()))?;

            match serde_json::from_slice::<Reply>(&bytes) {
                Ok(reply) => reply.into_result(status),
                Err(_) if status != 200 => Err(TransportError::Rejected {
                    status,
                    error: format!("http status {}", status),
                }),
                Err(e) => Err(TransportError::Malformed(e.to_string())),
            }
        }
    }
}
