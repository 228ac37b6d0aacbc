//! One-line import for binaries and integration tests.
//!
//! ```ignore
//! use kling_rs::prelude::*;
//! ```

pub use crate::error::{Error, Result, TransportError, UploadStepError};
pub use crate::poll::{CancelFlag, PollConfig, track_until_done, track_until_done_with};
pub use crate::status::{ModerationCategory, StatusClass, TaskStatus};
pub use crate::task::{WorkRef, delete_tasks, delete_works, submit, task_status};
pub use crate::transport::{
    ApiRequest, Body, Envelope, Method, RawResponse, Transport, TransportFuture, request_json,
};
pub use crate::types::{
    Argument, ArgumentName, CameraControl, CameraMovement, ContentKind, DEFAULT_BIZ,
    GenerationType, Limitation, Resource, StatusSnapshot, Submission, SubmitRequest, Task,
    TaskInfo, TaskInput, Work,
};
pub use crate::upload::{UploadStep, upload, upload_with_progress};
pub use crate::{API_BASE, KlingClient};
