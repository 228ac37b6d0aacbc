//! Job submission, status fetch, and cleanup calls.
//!
//! These are free functions over [`Transport`] so they run identically
//! against the production client and the canned transports used in tests;
//! [`KlingClient`](crate::KlingClient) wraps each one as a method.

use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use crate::error::{Error, Result, TransportError};
use crate::transport::{ApiRequest, Envelope, Transport, request_json};
use crate::types::{StatusSnapshot, Submission, SubmitRequest};

/// Reference to one work, as the deletion endpoint wants it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkRef {
    pub task_id: i64,
    pub work_id: i64,
}

/// Submits a generation request and returns the receipt.
///
/// One POST, no retry: resubmitting on error could create duplicate jobs.
/// If the service answers with one of the two content-moderation codes the
/// call fails with [`Error::ContentRejected`] instead of handing back a job
/// id; the human-readable reason from the response rides along.
pub async fn submit(
    transport: &dyn Transport,
    api_base: &str,
    request: &SubmitRequest,
) -> Result<Submission> {
    debug!(
        "submitting {:?} job with {} argument(s) and {} input(s)",
        request.task_type,
        request.arguments.len(),
        request.inputs.len()
    );
    let body = serde_json::to_value(request).map_err(TransportError::Json)?;
    let url = format!("{api_base}/api/task/submit");
    let envelope: Envelope<Submission> =
        request_json(transport, ApiRequest::post_json(url, body)).await?;
    let submission = envelope.into_data()?;

    if let Some(category) = submission.status.moderation_category() {
        return Err(Error::ContentRejected {
            category,
            reason: submission.message,
        });
    }

    info!(
        "task {} accepted with status {}",
        submission.task.id, submission.status
    );
    Ok(submission)
}

/// Fetches one status snapshot for `task_id`.
pub async fn task_status(
    transport: &dyn Transport,
    api_base: &str,
    task_id: i64,
) -> Result<StatusSnapshot> {
    let url = format!("{api_base}/api/task/status?taskId={task_id}");
    let envelope: Envelope<StatusSnapshot> = request_json(transport, ApiRequest::get(url)).await?;
    envelope.into_data()
}

/// Removes whole jobs, artifacts included.
pub async fn delete_tasks(
    transport: &dyn Transport,
    api_base: &str,
    task_ids: &[i64],
) -> Result<()> {
    let url = format!("{api_base}/api/task/del");
    let body = json!({ "taskIds": task_ids });
    let envelope: Envelope<serde_json::Value> =
        request_json(transport, ApiRequest::post_json(url, body)).await?;
    envelope.ok()?;
    info!("deleted {} task(s)", task_ids.len());
    Ok(())
}

/// Removes individual works without touching their parent jobs.
pub async fn delete_works(
    transport: &dyn Transport,
    api_base: &str,
    works: &[WorkRef],
) -> Result<()> {
    let url = format!("{api_base}/api/works/del");
    let body = json!({ "workInfos": works });
    let envelope: Envelope<serde_json::Value> =
        request_json(transport, ApiRequest::post_json(url, body)).await?;
    envelope.ok()?;
    info!("deleted {} work(s)", works.len());
    Ok(())
}
