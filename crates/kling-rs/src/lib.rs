//! Client for the Kling generative-media service.
//!
//! Submits image and video generation jobs, tracks them to completion under
//! a bounded polling budget, pushes reference images through the service's
//! five-step resumable upload handshake, and cleans up jobs and artifacts.
//! Ships as a library plus the `kling` CLI.
//!
//! # Getting started
//!
//! ```ignore
//! use std::path::Path;
//!
//! use kling_rs::prelude::*;
//!
//! let client = KlingClient::new(std::env::var("KLING_COOKIE")?)?;
//!
//! // Upload a reference image, then generate variations of it.
//! let reference = client.upload(Path::new("face.png")).await?;
//! let request = SubmitRequest::new(GenerationType::ImageToImage)
//!     .with_argument(Argument::prompt("watercolor portrait"))
//!     .with_argument(Argument::fidelity(0.6))
//!     .with_argument(Argument::image_count(4))
//!     .with_argument(Argument::biz())
//!     .with_input(TaskInput::url(reference));
//!
//! let submission = client.submit(&request).await?;
//! let done = client
//!     .track_until_done(submission.task_id(), &PollConfig::default())
//!     .await?;
//! for work in &done.works {
//!     println!("{}", work.url().unwrap_or("pending"));
//! }
//! ```
//!
//! # Where to find things
//!
//! | Module | Purpose |
//! |---|---|
//! | [`transport`] | HTTP seam: the [`Transport`] trait and request plumbing |
//! | [`types`] | Jobs, works, arguments, submission payloads |
//! | [`status`] | Status codes and their behavioral classes |
//! | [`task`] | Submit, status fetch, and deletion calls |
//! | [`poll`] | Bounded tracking loop with cooperative detachment |
//! | [`upload`] | Five-step resumable upload pipeline |
//! | [`error`] | Typed failure taxonomy |
//!
//! All operations are free functions over `&dyn Transport`; [`KlingClient`]
//! wraps them as methods and is the only piece that talks to the real
//! network.

pub mod error;
pub mod poll;
pub mod prelude;
pub mod status;
pub mod task;
pub mod transport;
pub mod types;
pub mod upload;

use std::path::Path;
use std::time::Duration;

use crate::error::{Result, TransportError};
use crate::poll::{CancelFlag, PollConfig};
use crate::task::WorkRef;
use crate::transport::{ApiRequest, Body, Method, RawResponse, Transport, TransportFuture};
use crate::types::{StatusSnapshot, Submission, SubmitRequest};
use crate::upload::UploadStep;

pub use crate::error::Error;

/// Main API host.
pub const API_BASE: &str = "https://klingai.kuaishou.com";

/// Production client: a reqwest-backed [`Transport`] plus the session cookie.
///
/// Cheap to clone; clones share one connection pool. The cookie is attached
/// verbatim to every call except the upload handshake steps that target the
/// issued endpoint host.
#[derive(Clone)]
pub struct KlingClient {
    http: reqwest::Client,
    cookie: String,
    api_base: String,
}

impl KlingClient {
    /// Builds a client around `cookie`, the caller-supplied session
    /// credential.
    pub fn new(cookie: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("kling-rs/0.3")
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(TransportError::Network)?;
        Ok(Self {
            http,
            cookie: cookie.into(),
            api_base: API_BASE.to_string(),
        })
    }

    /// Points the client at a different API host (proxies, test rigs).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Submits a generation request. See [`task::submit`].
    pub async fn submit(&self, request: &SubmitRequest) -> Result<Submission> {
        task::submit(self, &self.api_base, request).await
    }

    /// Fetches one status snapshot. See [`task::task_status`].
    pub async fn task_status(&self, task_id: i64) -> Result<StatusSnapshot> {
        task::task_status(self, &self.api_base, task_id).await
    }

    /// Polls until a terminal status. See [`poll::track_until_done`].
    pub async fn track_until_done(
        &self,
        task_id: i64,
        config: &PollConfig,
    ) -> Result<StatusSnapshot> {
        poll::track_until_done(self, &self.api_base, task_id, config).await
    }

    /// Polls with progress reporting and a detachment handle. See
    /// [`poll::track_until_done_with`].
    pub async fn track_until_done_with(
        &self,
        task_id: i64,
        config: &PollConfig,
        cancel: &CancelFlag,
        on_update: impl FnMut(&StatusSnapshot),
    ) -> Result<StatusSnapshot> {
        poll::track_until_done_with(self, &self.api_base, task_id, config, cancel, on_update).await
    }

    /// Runs the upload pipeline. See [`upload::upload`].
    pub async fn upload(&self, path: &Path) -> Result<String> {
        upload::upload(self, &self.api_base, path).await
    }

    /// Runs the upload pipeline with per-step progress. See
    /// [`upload::upload_with_progress`].
    pub async fn upload_with_progress(
        &self,
        path: &Path,
        on_step: impl FnMut(UploadStep),
    ) -> Result<String> {
        upload::upload_with_progress(self, &self.api_base, path, on_step).await
    }

    /// Removes whole jobs. See [`task::delete_tasks`].
    pub async fn delete_tasks(&self, task_ids: &[i64]) -> Result<()> {
        task::delete_tasks(self, &self.api_base, task_ids).await
    }

    /// Removes individual works. See [`task::delete_works`].
    pub async fn delete_works(&self, works: &[WorkRef]) -> Result<()> {
        task::delete_works(self, &self.api_base, works).await
    }
}

impl Transport for KlingClient {
    fn send(&self, request: ApiRequest) -> TransportFuture<'_> {
        Box::pin(async move {
            let mut builder = match request.method {
                Method::Get => self.http.get(&request.url),
                Method::Post => self.http.post(&request.url),
            };
            if request.credential {
                builder = builder.header(reqwest::header::COOKIE, &self.cookie);
            }
            builder = match request.body {
                Body::Empty => {
                    builder.header(reqwest::header::CONTENT_TYPE, "application/json")
                }
                Body::Json(value) => builder.json(&value),
                Body::Octets(bytes) => builder
                    .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                    .body(bytes),
            };
            let response = builder.send().await.map_err(TransportError::Network)?;
            let status = response.status().as_u16();
            let body = response.bytes().await.map_err(TransportError::Network)?.to_vec();
            Ok(RawResponse { status, body })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_construction_and_base_override() {
        let client = KlingClient::new("session=abc").unwrap();
        assert_eq!(client.api_base(), API_BASE);

        let client = client.with_api_base("https://proxy.test");
        assert_eq!(client.api_base(), "https://proxy.test");
    }
}
