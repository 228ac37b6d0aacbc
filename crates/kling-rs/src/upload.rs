//! Five-step resumable upload pipeline.
//!
//! Strictly sequential handshake: issue token → resume probe → fragment →
//! complete → verify. The token grant names a dedicated upload host; the
//! three middle steps talk to that host without the session cookie, while
//! issue and verify go to the main API host with it. Only the verified URL
//! leaves the pipeline; the endpoint/token session is discarded afterward.
//!
//! Only single-fragment uploads are supported: the file is sent whole as
//! fragment 0 and finalized with a fragment count of 1.

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result, UploadStepError};
use crate::transport::{ApiRequest, Envelope, Transport, request_json};

/// Pause before the single retry of the complete and verify steps.
const STEP_RETRY_DELAY: Duration = Duration::from_secs(3);

/// The five handshake steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStep {
    IssueToken,
    Resume,
    Fragment,
    Complete,
    Verify,
}

impl fmt::Display for UploadStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UploadStep::IssueToken => "issue token",
            UploadStep::Resume => "resume",
            UploadStep::Fragment => "fragment",
            UploadStep::Complete => "complete",
            UploadStep::Verify => "verify",
        };
        f.write_str(name)
    }
}

/// Endpoint + token pair identifying one in-progress upload. Never reused
/// across pipeline runs.
#[derive(Debug, Clone)]
struct UploadSession {
    endpoint: String,
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenGrant {
    #[serde(default)]
    token: String,
    #[serde(default)]
    http_endpoints: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct StepResult {
    #[serde(default)]
    result: i64,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    #[serde(default)]
    url: String,
}

/// Uploads `path` and returns the verified resource URL.
pub async fn upload(transport: &dyn Transport, api_base: &str, path: &Path) -> Result<String> {
    upload_with_progress(transport, api_base, path, |_| {}).await
}

/// Uploads `path`, invoking `on_step` after each completed step.
///
/// The callback is advisory and cannot alter control flow. Steps run
/// strictly in order; `complete` and `verify` retry once after a short
/// delay since both race server-side assembly, the rest fail the pipeline
/// outright with a step-tagged error.
///
/// # Example
///
/// ```ignore
/// let url = upload_with_progress(&client, API_BASE, Path::new("ref.png"), |step| {
///     println!("finished {step}");
/// })
/// .await?;
/// ```
pub async fn upload_with_progress(
    transport: &dyn Transport,
    api_base: &str,
    path: &Path,
    mut on_step: impl FnMut(UploadStep),
) -> Result<String> {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.bin".to_string());

    let session = issue_token(transport, api_base, &filename)
        .await
        .map_err(at_step(UploadStep::IssueToken))?;
    on_step(UploadStep::IssueToken);

    resume(transport, &session)
        .await
        .map_err(at_step(UploadStep::Resume))?;
    on_step(UploadStep::Resume);

    let bytes = tokio::fs::read(path)
        .await
        .map_err(UploadStepError::Io)
        .map_err(at_step(UploadStep::Fragment))?;
    debug!("uploading {filename} ({} bytes) as fragment 0", bytes.len());
    send_fragment(transport, &session, bytes)
        .await
        .map_err(at_step(UploadStep::Fragment))?;
    on_step(UploadStep::Fragment);

    retry_once(UploadStep::Complete, || complete(transport, &session)).await?;
    on_step(UploadStep::Complete);

    let url = retry_once(UploadStep::Verify, || verify(transport, api_base, &session)).await?;
    on_step(UploadStep::Verify);

    info!("upload of {filename} verified at {url}");
    Ok(url)
}

/// Tags errors from one step of the pipeline.
fn at_step(step: UploadStep) -> impl FnOnce(UploadStepError) -> Error {
    move |cause| Error::UploadStepFailed { step, cause }
}

/// Runs `step` and, if it fails, retries exactly once after a fixed pause.
async fn retry_once<T, F, Fut>(tag: UploadStep, mut step: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, UploadStepError>>,
{
    match step().await {
        Ok(value) => Ok(value),
        Err(first) => {
            warn!("{tag} step failed, retrying once: {first}");
            tokio::time::sleep(STEP_RETRY_DELAY).await;
            step().await.map_err(at_step(tag))
        }
    }
}

async fn issue_token(
    transport: &dyn Transport,
    api_base: &str,
    filename: &str,
) -> Result<UploadSession, UploadStepError> {
    let url = format!("{api_base}/api/upload/issue/token?filename={filename}");
    let envelope: Envelope<TokenGrant> = request_json(transport, ApiRequest::get(url)).await?;
    let status = envelope.status;
    let Some(grant) = envelope.data.filter(|_| status == 200) else {
        return Err(UploadStepError::NoEndpoint { status });
    };
    match grant.http_endpoints.into_iter().next() {
        Some(endpoint) if !grant.token.is_empty() => {
            debug!("upload endpoint {endpoint} issued for {filename}");
            Ok(UploadSession {
                endpoint,
                token: grant.token,
            })
        }
        _ => Err(UploadStepError::NoEndpoint { status }),
    }
}

/// Probes the session before spending bandwidth on the fragment.
async fn resume(transport: &dyn Transport, session: &UploadSession) -> Result<(), UploadStepError> {
    let url = format!(
        "https://{}/api/upload/resume?upload_token={}",
        session.endpoint, session.token
    );
    let response: StepResult =
        request_json(transport, ApiRequest::get(url).without_credential()).await?;
    accepted(response)
}

async fn send_fragment(
    transport: &dyn Transport,
    session: &UploadSession,
    bytes: Vec<u8>,
) -> Result<(), UploadStepError> {
    let url = format!(
        "https://{}/api/upload/fragment?upload_token={}&fragment_id=0",
        session.endpoint, session.token
    );
    let response: StepResult =
        request_json(transport, ApiRequest::post_octets(url, bytes).without_credential()).await?;
    accepted(response)
}

async fn complete(
    transport: &dyn Transport,
    session: &UploadSession,
) -> Result<(), UploadStepError> {
    let url = format!(
        "https://{}/api/upload/complete?fragment_count=1&upload_token={}",
        session.endpoint, session.token
    );
    let response: StepResult =
        request_json(transport, ApiRequest::post_empty(url).without_credential()).await?;
    accepted(response)
}

async fn verify(
    transport: &dyn Transport,
    api_base: &str,
    session: &UploadSession,
) -> Result<String, UploadStepError> {
    let url = format!("{api_base}/api/upload/verify/token?token={}", session.token);
    let envelope: Envelope<VerifyData> = request_json(transport, ApiRequest::get(url)).await?;
    let status = envelope.status;
    match envelope.data {
        Some(data) if status == 200 && !data.url.is_empty() => Ok(data.url),
        _ => Err(UploadStepError::NotVerified { status }),
    }
}

fn accepted(response: StepResult) -> Result<(), UploadStepError> {
    if response.result == 1 {
        Ok(())
    } else {
        Err(UploadStepError::Refused {
            result: response.result,
        })
    }
}
