//! HTTP plumbing shared by every service call.
//!
//! [`Transport`] is the seam between the operations and the network. The
//! production implementation lives on [`KlingClient`](crate::KlingClient);
//! tests substitute queue-backed fakes that replay canned bodies.

use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, TransportError};

/// Boxed future returned by [`Transport::send`], so the trait stays
/// dyn-compatible.
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + Send + 'a>>;

/// HTTP verbs the service surface needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Request body variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    /// JSON payload, sent as `application/json`.
    Json(serde_json::Value),
    /// Raw file bytes, sent as `application/octet-stream`.
    Octets(Vec<u8>),
}

/// One call against the service, described declaratively.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub body: Body,
    /// Whether to attach the session cookie. The upload handshake steps that
    /// target the issued endpoint host run without it.
    pub credential: bool,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: Body::Empty,
            credential: true,
        }
    }

    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            body: Body::Json(body),
            credential: true,
        }
    }

    pub fn post_empty(url: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            body: Body::Empty,
            credential: true,
        }
    }

    pub fn post_octets(url: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            body: Body::Octets(bytes),
            credential: true,
        }
    }

    /// Drops the session cookie from this call.
    pub fn without_credential(mut self) -> Self {
        self.credential = false;
        self
    }
}

/// Raw HTTP outcome: status line plus body bytes.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Performs calls against the service.
///
/// Kept dyn-compatible so operations can take `&dyn Transport` and tests can
/// drive them with canned responses.
pub trait Transport: Send + Sync {
    /// Performs one HTTP call.
    fn send(&self, request: ApiRequest) -> TransportFuture<'_>;
}

/// Sends `request` and decodes the JSON body into `T`.
///
/// Non-2xx responses become [`TransportError::Status`] with the body text
/// preserved; malformed JSON becomes [`TransportError::Json`].
pub async fn request_json<T: DeserializeOwned>(
    transport: &dyn Transport,
    request: ApiRequest,
) -> Result<T, TransportError> {
    let response = transport.send(request).await?;
    if !(200..300).contains(&response.status) {
        return Err(TransportError::Status {
            status: response.status,
            body: String::from_utf8_lossy(&response.body).into_owned(),
        });
    }
    Ok(serde_json::from_slice(&response.body)?)
}

/// Standard envelope wrapping every main-host payload.
///
/// The service encodes business errors inside HTTP 200 bodies: `status` is
/// 200 only when `data` is meaningful.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub status: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Extracts the payload, translating envelope-level refusals into
    /// [`Error::Api`].
    pub fn into_data(self) -> Result<T, Error> {
        if self.status != 200 {
            return Err(Error::Api {
                status: self.status,
                message: self.message,
            });
        }
        self.data.ok_or(Error::Api {
            status: self.status,
            message: "envelope carried no data".to_string(),
        })
    }

    /// Checks the envelope status alone, for calls whose payload is null.
    pub fn ok(self) -> Result<(), Error> {
        if self.status == 200 {
            Ok(())
        } else {
            Err(Error::Api {
                status: self.status,
                message: self.message,
            })
        }
    }
}
