//! Job status codes and their behavioral classes.
//!
//! The service reports job and work state as bare integers. Whether to keep
//! polling or stop derives from the code alone, never from the message text
//! that rides alongside it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status vocabulary shared by jobs and their works.
///
/// Codes the client does not know decode as [`TaskStatus::Other`] and
/// classify as failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum TaskStatus {
    /// 0
    Unknown,
    /// 3
    SafeInput,
    /// 4
    NotExist,
    /// 5
    Queuing,
    /// 6
    UnqualifiedInput,
    /// 7
    SensitiveText,
    /// 8
    SensitiveImage,
    /// 9
    SensitiveResult,
    /// 10
    Running,
    /// 50
    Failed,
    /// 51
    NoFaceDetected,
    /// 52
    PaymentFailed,
    /// 98
    PartialCompleted,
    /// 99
    Completed,
    /// Anything the server invents after this table was written.
    Other(i64),
}

/// Behavioral class of a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// Job id unknown to the server; distinct from failure.
    NotFound,
    /// Fully or partially completed.
    Success,
    /// Queued or running; the only class that keeps polling alive.
    Processing,
    /// Every terminal outcome that is not success.
    Failed,
}

/// Which kind of input tripped content moderation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationCategory {
    Text,
    Image,
}

impl TaskStatus {
    /// Raw wire code.
    pub fn code(self) -> i64 {
        self.into()
    }

    /// Class driving the poller's continue/stop decision.
    pub fn class(self) -> StatusClass {
        match self {
            TaskStatus::NotExist => StatusClass::NotFound,
            TaskStatus::PartialCompleted | TaskStatus::Completed => StatusClass::Success,
            TaskStatus::Queuing | TaskStatus::Running => StatusClass::Processing,
            _ => StatusClass::Failed,
        }
    }

    /// True for any status that stops polling.
    pub fn is_terminal(self) -> bool {
        self.class() != StatusClass::Processing
    }

    /// Moderation category for the two sensitive-input codes, [`None`] for
    /// everything else.
    pub fn moderation_category(self) -> Option<ModerationCategory> {
        match self {
            TaskStatus::SensitiveText => Some(ModerationCategory::Text),
            TaskStatus::SensitiveImage => Some(ModerationCategory::Image),
            _ => None,
        }
    }
}

impl From<i64> for TaskStatus {
    fn from(code: i64) -> Self {
        match code {
            0 => TaskStatus::Unknown,
            3 => TaskStatus::SafeInput,
            4 => TaskStatus::NotExist,
            5 => TaskStatus::Queuing,
            6 => TaskStatus::UnqualifiedInput,
            7 => TaskStatus::SensitiveText,
            8 => TaskStatus::SensitiveImage,
            9 => TaskStatus::SensitiveResult,
            10 => TaskStatus::Running,
            50 => TaskStatus::Failed,
            51 => TaskStatus::NoFaceDetected,
            52 => TaskStatus::PaymentFailed,
            98 => TaskStatus::PartialCompleted,
            99 => TaskStatus::Completed,
            other => TaskStatus::Other(other),
        }
    }
}

impl From<TaskStatus> for i64 {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Unknown => 0,
            TaskStatus::SafeInput => 3,
            TaskStatus::NotExist => 4,
            TaskStatus::Queuing => 5,
            TaskStatus::UnqualifiedInput => 6,
            TaskStatus::SensitiveText => 7,
            TaskStatus::SensitiveImage => 8,
            TaskStatus::SensitiveResult => 9,
            TaskStatus::Running => 10,
            TaskStatus::Failed => 50,
            TaskStatus::NoFaceDetected => 51,
            TaskStatus::PaymentFailed => 52,
            TaskStatus::PartialCompleted => 98,
            TaskStatus::Completed => 99,
            TaskStatus::Other(code) => code,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskStatus::Unknown => "unknown",
            TaskStatus::SafeInput => "safe input",
            TaskStatus::NotExist => "not found",
            TaskStatus::Queuing => "queuing",
            TaskStatus::UnqualifiedInput => "unqualified input",
            TaskStatus::SensitiveText => "sensitive text",
            TaskStatus::SensitiveImage => "sensitive image",
            TaskStatus::SensitiveResult => "sensitive result",
            TaskStatus::Running => "running",
            TaskStatus::Failed => "failed",
            TaskStatus::NoFaceDetected => "no face detected",
            TaskStatus::PaymentFailed => "payment failed",
            TaskStatus::PartialCompleted => "partially completed",
            TaskStatus::Completed => "completed",
            TaskStatus::Other(_) => "unrecognized",
        };
        write!(f, "{name} ({})", self.code())
    }
}

impl fmt::Display for ModerationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModerationCategory::Text => write!(f, "text"),
            ModerationCategory::Image => write!(f, "image"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_match_the_code_table() {
        assert_eq!(TaskStatus::NotExist.class(), StatusClass::NotFound);
        assert_eq!(TaskStatus::PartialCompleted.class(), StatusClass::Success);
        assert_eq!(TaskStatus::Completed.class(), StatusClass::Success);
        assert_eq!(TaskStatus::Queuing.class(), StatusClass::Processing);
        assert_eq!(TaskStatus::Running.class(), StatusClass::Processing);
        for failed in [
            TaskStatus::Unknown,
            TaskStatus::SafeInput,
            TaskStatus::UnqualifiedInput,
            TaskStatus::SensitiveText,
            TaskStatus::SensitiveImage,
            TaskStatus::SensitiveResult,
            TaskStatus::Failed,
            TaskStatus::NoFaceDetected,
            TaskStatus::PaymentFailed,
        ] {
            assert_eq!(failed.class(), StatusClass::Failed, "{failed}");
        }
    }

    #[test]
    fn unknown_codes_classify_as_failed() {
        let status = TaskStatus::from(123);
        assert_eq!(status, TaskStatus::Other(123));
        assert_eq!(status.class(), StatusClass::Failed);
        assert!(status.is_terminal());
    }

    #[test]
    fn moderation_map_is_exactly_two_codes() {
        assert_eq!(
            TaskStatus::SensitiveText.moderation_category(),
            Some(ModerationCategory::Text)
        );
        assert_eq!(
            TaskStatus::SensitiveImage.moderation_category(),
            Some(ModerationCategory::Image)
        );
        assert_eq!(TaskStatus::SensitiveResult.moderation_category(), None);
        assert_eq!(TaskStatus::Failed.moderation_category(), None);
    }

    #[test]
    fn codes_round_trip() {
        for code in [0, 3, 4, 5, 6, 7, 8, 9, 10, 50, 51, 52, 98, 99, 777] {
            assert_eq!(TaskStatus::from(code).code(), code);
        }
    }

    #[test]
    fn decodes_from_bare_integers() {
        let status: TaskStatus = serde_json::from_str("99").unwrap();
        assert_eq!(status, TaskStatus::Completed);
        assert_eq!(serde_json::to_string(&TaskStatus::Queuing).unwrap(), "5");
    }

    #[test]
    fn display_includes_the_raw_code() {
        assert_eq!(TaskStatus::Completed.to_string(), "completed (99)");
        assert_eq!(TaskStatus::Other(42).to_string(), "unrecognized (42)");
    }
}
