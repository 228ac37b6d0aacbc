//! Typed failure taxonomy.
//!
//! Three layers: [`TransportError`] for anything that goes wrong moving
//! bytes, [`UploadStepError`] for the cause inside one tagged upload step,
//! and [`Error`] for everything callers of the public operations can see.
//! Business-level refusals are translated into these variants at the
//! component boundary, so callers never match on raw status codes.

use thiserror::Error;

use crate::status::{ModerationCategory, TaskStatus};
use crate::upload::UploadStep;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure in the HTTP layer itself.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request never completed (DNS, TLS, connect, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered outside the 2xx range. The body text is kept for
    /// diagnostics.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The body was not the JSON shape we expected.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Cause attached to a failed upload step.
#[derive(Debug, Error)]
pub enum UploadStepError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Reading the local file failed.
    #[error("could not read local file: {0}")]
    Io(#[from] std::io::Error),

    /// A handshake step answered with a refusal code instead of `result == 1`.
    #[error("service refused the step (result {result})")]
    Refused { result: i64 },

    /// The token grant came back without a usable endpoint or token.
    #[error("token grant returned no upload endpoint (status {status})")]
    NoEndpoint { status: i64 },

    /// Verification did not confirm a persisted resource.
    #[error("resource not verified (status {status})")]
    NotVerified { status: i64 },
}

/// Everything the public operations can fail with.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The service reported a business error inside a well-formed envelope,
    /// e.g. an expired session cookie.
    #[error("service error {status}: {message}")]
    Api { status: i64, message: String },

    /// Submission was blocked by content moderation; no job was created.
    #[error("submission rejected by {category} moderation: {reason}")]
    ContentRejected {
        category: ModerationCategory,
        reason: String,
    },

    /// The tracked job id is unknown to the server.
    #[error("task {task_id} does not exist")]
    TaskNotFound { task_id: i64 },

    /// The server reported the job terminally failed.
    #[error("task {task_id} failed with status {status}: {message}")]
    JobFailed {
        task_id: i64,
        status: TaskStatus,
        message: String,
    },

    /// The retry budget ran out while the job was still processing. The job
    /// may well finish later; we just stopped watching.
    #[error("task {task_id} still processing after {attempts} status checks")]
    PollExhausted { task_id: i64, attempts: u32 },

    /// Tracking was detached through a [`CancelFlag`](crate::poll::CancelFlag).
    #[error("tracking of task {task_id} was cancelled")]
    Cancelled { task_id: i64 },

    /// One of the five upload steps failed.
    #[error("upload failed at {step} step: {cause}")]
    UploadStepFailed {
        step: UploadStep,
        #[source]
        cause: UploadStepError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_actionable_context() {
        let err = Error::JobFailed {
            task_id: 77,
            status: TaskStatus::NoFaceDetected,
            message: "no face".into(),
        };
        assert_eq!(
            err.to_string(),
            "task 77 failed with status no face detected (51): no face"
        );

        let err = Error::ContentRejected {
            category: ModerationCategory::Image,
            reason: "policy".into(),
        };
        assert_eq!(
            err.to_string(),
            "submission rejected by image moderation: policy"
        );
    }

    #[test]
    fn upload_failures_name_the_step() {
        let err = Error::UploadStepFailed {
            step: UploadStep::Complete,
            cause: UploadStepError::Refused { result: 0 },
        };
        assert_eq!(
            err.to_string(),
            "upload failed at complete step: service refused the step (result 0)"
        );
    }

    #[test]
    fn exhaustion_is_not_a_job_failure() {
        let err = Error::PollExhausted {
            task_id: 9,
            attempts: 300,
        };
        assert!(matches!(err, Error::PollExhausted { .. }));
        assert_eq!(
            err.to_string(),
            "task 9 still processing after 300 status checks"
        );
    }
}
