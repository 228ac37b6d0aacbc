//! Wire-level data model: jobs, works, and the submission payload.
//!
//! Field names mirror the service's camelCase JSON exactly. Argument and
//! input lists are order-significant as sent; callers conventionally treat
//! the first argument's value as the job title, but nothing here assumes
//! semantics beyond the name.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::status::TaskStatus;

/// Business tag the service expects on every submission.
pub const DEFAULT_BIZ: &str = "klingai";

// ── Generation modes ─────────────────────────────────────────────────

/// Closed set of generation modes the service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationType {
    #[serde(rename = "mmu_txt2img_aiweb")]
    TextToImage,
    #[serde(rename = "mmu_img2img_aiweb")]
    ImageToImage,
    #[serde(rename = "m2v_txt2video")]
    TextToVideo,
    #[serde(rename = "m2v_txt2video_hq")]
    TextToVideoHq,
    #[serde(rename = "m2v_img2video")]
    ImageToVideo,
    #[serde(rename = "m2v_img2video_hq")]
    ImageToVideoHq,
}

impl GenerationType {
    /// Video jobs run for minutes rather than seconds; callers use this to
    /// pick a poll interval.
    pub fn is_video(self) -> bool {
        matches!(
            self,
            Self::TextToVideo | Self::TextToVideoHq | Self::ImageToVideo | Self::ImageToVideoHq
        )
    }

    /// Upgrades a video mode to its high-quality variant. Image modes are
    /// returned unchanged.
    pub fn high_quality(self) -> Self {
        match self {
            Self::TextToVideo => Self::TextToVideoHq,
            Self::ImageToVideo => Self::ImageToVideoHq,
            other => other,
        }
    }
}

// ── Arguments and inputs ─────────────────────────────────────────────

/// Fixed vocabulary of argument names accepted at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentName {
    Prompt,
    Style,
    AspectRatio,
    ImageCount,
    Fidelity,
    NegativePrompt,
    Cfg,
    Duration,
    Biz,
    CameraJson,
    TailImageEnabled,
}

impl ArgumentName {
    /// Wire spelling. Mostly snake_case with one camelCase stray the backend
    /// insists on.
    pub const fn as_str(self) -> &'static str {
        match self {
            ArgumentName::Prompt => "prompt",
            ArgumentName::Style => "style",
            ArgumentName::AspectRatio => "aspect_ratio",
            ArgumentName::ImageCount => "imageCount",
            ArgumentName::Fidelity => "fidelity",
            ArgumentName::NegativePrompt => "negative_prompt",
            ArgumentName::Cfg => "cfg",
            ArgumentName::Duration => "duration",
            ArgumentName::Biz => "biz",
            ArgumentName::CameraJson => "camera_json",
            ArgumentName::TailImageEnabled => "tail_image_enabled",
        }
    }
}

impl fmt::Display for ArgumentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One name/value pair in a submission's ordered argument list.
///
/// The name field stays a plain string so that server echoes with names
/// outside today's vocabulary still decode; the constructors below are the
/// typed way in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    pub value: String,
}

impl Argument {
    pub fn new(name: ArgumentName, value: impl Into<String>) -> Self {
        Self {
            name: name.as_str().to_string(),
            value: value.into(),
        }
    }

    pub fn prompt(text: impl Into<String>) -> Self {
        Self::new(ArgumentName::Prompt, text)
    }

    pub fn style(style: impl Into<String>) -> Self {
        Self::new(ArgumentName::Style, style)
    }

    /// Aspect ratio such as `"1:1"` or `"16:9"`.
    pub fn aspect_ratio(ratio: impl Into<String>) -> Self {
        Self::new(ArgumentName::AspectRatio, ratio)
    }

    pub fn image_count(count: u32) -> Self {
        Self::new(ArgumentName::ImageCount, count.to_string())
    }

    /// Reference-image adherence, 0.0..=1.0. Range is not validated here.
    pub fn fidelity(value: f64) -> Self {
        Self::new(ArgumentName::Fidelity, value.to_string())
    }

    pub fn negative_prompt(text: impl Into<String>) -> Self {
        Self::new(ArgumentName::NegativePrompt, text)
    }

    /// Prompt-adherence weight for video jobs, 0.0..=1.0.
    pub fn cfg(value: f64) -> Self {
        Self::new(ArgumentName::Cfg, value.to_string())
    }

    /// Clip length in seconds.
    pub fn duration(seconds: u32) -> Self {
        Self::new(ArgumentName::Duration, seconds.to_string())
    }

    pub fn biz() -> Self {
        Self::new(ArgumentName::Biz, DEFAULT_BIZ)
    }

    /// Camera movement directive for text→video jobs, serialized into the
    /// value as embedded JSON.
    pub fn camera(control: &CameraControl) -> Self {
        Self::new(ArgumentName::CameraJson, control.to_json())
    }

    /// Holds the last frame of an image→video continuation.
    pub fn tail_image(enabled: bool) -> Self {
        Self::new(
            ArgumentName::TailImageEnabled,
            if enabled { "true" } else { "false" },
        )
    }
}

/// Kinds of input reference. One kind exists today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputType {
    #[serde(rename = "URL")]
    Url,
}

/// One entry in a submission's ordered input list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    pub name: String,
    pub input_type: InputType,
    pub url: String,
    /// Id of the prior work this input was derived from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_work_id: Option<i64>,
}

impl TaskInput {
    /// Reference to an uploaded or external resource.
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            name: "input".to_string(),
            input_type: InputType::Url,
            url: url.into(),
            from_work_id: None,
        }
    }

    /// Reference derived from a previously generated work.
    pub fn from_work(url: impl Into<String>, work_id: i64) -> Self {
        Self {
            from_work_id: Some(work_id),
            ..Self::url(url)
        }
    }
}

// ── Camera controls ──────────────────────────────────────────────────

/// Camera movement kinds for text→video jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraMovement {
    Empty,
    DownBack,
    ForwardUp,
    RightTurnForward,
    LeftTurnForward,
    Horizontal,
    Vertical,
    Zoom,
    Tilt,
    Pan,
    Roll,
}

/// Camera directive serialized into the `camera_json` argument.
///
/// The magnitude fields apply to the single-axis movements; the composite
/// movements ignore them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraControl {
    #[serde(rename = "type")]
    pub movement: CameraMovement,
    pub horizontal: f64,
    pub vertical: f64,
    pub zoom: f64,
    pub tilt: f64,
    pub pan: f64,
    pub roll: f64,
}

impl Default for CameraControl {
    fn default() -> Self {
        Self {
            movement: CameraMovement::Empty,
            horizontal: 0.0,
            vertical: 0.0,
            zoom: 0.0,
            tilt: 0.0,
            pan: 0.0,
            roll: 0.0,
        }
    }
}

impl CameraControl {
    /// Single-axis movement with the given magnitude.
    pub fn axis(movement: CameraMovement, amount: f64) -> Self {
        let axis = |m: CameraMovement| if movement == m { amount } else { 0.0 };
        Self {
            movement,
            horizontal: axis(CameraMovement::Horizontal),
            vertical: axis(CameraMovement::Vertical),
            zoom: axis(CameraMovement::Zoom),
            tilt: axis(CameraMovement::Tilt),
            pan: axis(CameraMovement::Pan),
            roll: axis(CameraMovement::Roll),
        }
    }

    pub(crate) fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ── Submission payload ───────────────────────────────────────────────

/// Payload for the submit endpoint.
///
/// Argument and input order is preserved exactly as built.
///
/// # Example
///
/// ```ignore
/// let request = SubmitRequest::new(GenerationType::TextToImage)
///     .with_argument(Argument::prompt("corgi astronaut"))
///     .with_argument(Argument::aspect_ratio("1:1"))
///     .with_argument(Argument::image_count(4))
///     .with_argument(Argument::biz());
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct SubmitRequest {
    #[serde(rename = "type")]
    pub task_type: GenerationType,
    pub arguments: Vec<Argument>,
    pub inputs: Vec<TaskInput>,
}

impl SubmitRequest {
    pub fn new(task_type: GenerationType) -> Self {
        Self {
            task_type,
            arguments: Vec::new(),
            inputs: Vec::new(),
        }
    }

    pub fn with_argument(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn with_input(mut self, input: TaskInput) -> Self {
        self.inputs.push(input);
        self
    }

    /// Display title by caller convention: the first argument's value.
    pub fn title(&self) -> Option<&str> {
        self.arguments.first().map(|a| a.value.as_str())
    }
}

// ── Server-side records ──────────────────────────────────────────────

/// Generation parameters echoed back inside [`Task`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    #[serde(rename = "type", default)]
    pub task_type: String,
    #[serde(default)]
    pub arguments: Vec<Argument>,
    #[serde(default)]
    pub inputs: Vec<TaskInput>,
}

/// One server-side generation job.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    #[serde(default)]
    pub user_id: i64,
    /// Echo of the generation mode; kept as a plain string since the server
    /// may know modes this client does not.
    #[serde(rename = "type", default)]
    pub task_type: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub task_info: Option<TaskInfo>,
    #[serde(default)]
    pub favored: bool,
    #[serde(default)]
    pub starred: bool,
    /// Epoch milliseconds.
    #[serde(default)]
    pub create_time: i64,
    #[serde(default)]
    pub update_time: i64,
}

/// Media kind of a produced work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Image,
    Video,
    #[serde(other)]
    Other,
}

/// Descriptor of a stored media resource.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Resource {
    /// Content URL.
    pub resource: String,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub width: u32,
    /// Milliseconds; zero for images.
    #[serde(default)]
    pub duration: i64,
}

/// One produced artifact belonging to a job.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Work {
    pub work_id: i64,
    pub task_id: i64,
    #[serde(rename = "type", default)]
    pub work_type: String,
    pub status: TaskStatus,
    pub content_type: ContentKind,
    #[serde(default)]
    pub resource: Option<Resource>,
    /// Poster frame, present on video works.
    #[serde(default)]
    pub cover: Option<Resource>,
    #[serde(default)]
    pub star_num: i64,
    #[serde(default)]
    pub report_num: i64,
    #[serde(default)]
    pub favored: bool,
    #[serde(default)]
    pub starred: bool,
    /// Epoch milliseconds.
    #[serde(default)]
    pub create_time: i64,
}

impl Work {
    /// URL of the stored artifact, once the server has published one.
    pub fn url(&self) -> Option<&str> {
        self.resource.as_ref().map(|r| r.resource.as_str())
    }
}

/// Quota snapshot included in a submit receipt.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Limitation {
    #[serde(rename = "type", default)]
    pub limit_type: String,
    #[serde(default)]
    pub remaining: i64,
    #[serde(default)]
    pub limit: i64,
}

// ── Operation payloads ───────────────────────────────────────────────

/// What the submit endpoint hands back: the created job, any works the
/// server materialized immediately, and the caller's remaining quota.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub status: TaskStatus,
    #[serde(default)]
    pub message: String,
    pub task: Task,
    #[serde(default)]
    pub works: Vec<Work>,
    #[serde(default)]
    pub limitation: Option<Limitation>,
}

impl Submission {
    pub fn task_id(&self) -> i64 {
        self.task.id
    }
}

/// One status fetch; what the poller emits to `on_update`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub status: TaskStatus,
    /// Server's remaining-time estimate, seconds.
    #[serde(default)]
    pub eta_time: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub task: Option<Task>,
    #[serde(default)]
    pub works: Vec<Work>,
}
