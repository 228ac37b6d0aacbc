//! End-to-end flows over a scripted transport: submission feeding the
//! poller, the upload handshake feeding a submission, and moderation
//! short-circuits.

use std::io::Write;
use std::sync::Mutex;

use kling_rs::prelude::*;
use serde_json::{Value, json};

const BASE: &str = "https://api.test";

/// Plays back `(http status, body)` pairs in order and records every request.
struct ScriptedTransport {
    responses: Mutex<Vec<(u16, String)>>,
    seen: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    fn new(script: &[(u16, Value)]) -> Self {
        Self {
            responses: Mutex::new(
                script
                    .iter()
                    .rev()
                    .map(|(status, body)| (*status, body.to_string()))
                    .collect(),
            ),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn request(&self, index: usize) -> ApiRequest {
        self.seen.lock().unwrap()[index].clone()
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: ApiRequest) -> TransportFuture<'_> {
        self.seen.lock().unwrap().push(request);
        let (status, body) = self
            .responses
            .lock()
            .unwrap()
            .pop()
            .expect("script exhausted");
        Box::pin(async move {
            Ok(RawResponse {
                status,
                body: body.into_bytes(),
            })
        })
    }
}

fn accepted_submit(task_id: i64, task_type: &str) -> Value {
    json!({
        "status": 200,
        "message": "",
        "data": {
            "status": 5,
            "message": "",
            "task": {
                "id": task_id,
                "userId": 1,
                "type": task_type,
                "status": 5,
                "createTime": 1700000000000i64,
                "updateTime": 1700000000000i64,
            },
            "works": [],
            "limitation": {"type": task_type, "remaining": 9, "limit": 30},
        },
    })
}

fn snapshot(code: i64, works: Value) -> Value {
    json!({
        "status": 200,
        "message": "",
        "data": {"status": code, "etaTime": 30, "message": "", "task": null, "works": works},
    })
}

fn image_work(id: i64) -> Value {
    json!({
        "workId": id,
        "taskId": 600,
        "type": "mmu_txt2img_aiweb",
        "status": 99,
        "contentType": "image",
        "resource": {
            "resource": format!("https://cdn.test/{id}.png"),
            "height": 1024,
            "width": 1024,
            "duration": 0,
        },
    })
}

fn video_work(task_id: i64) -> Value {
    json!({
        "workId": 7001,
        "taskId": task_id,
        "type": "m2v_img2video_hq",
        "status": 99,
        "contentType": "video",
        "resource": {
            "resource": "https://cdn.test/clip.mp4",
            "height": 1080,
            "width": 1920,
            "duration": 5000,
        },
        "cover": {
            "resource": "https://cdn.test/cover.png",
            "height": 1080,
            "width": 1920,
            "duration": 0,
        },
    })
}

#[tokio::test(start_paused = true)]
async fn text_to_image_flows_from_submit_to_finished_works() {
    let transport = ScriptedTransport::new(&[
        (200, accepted_submit(600, "mmu_txt2img_aiweb")),
        (200, snapshot(5, json!([]))),
        (
            200,
            snapshot(
                99,
                json!([image_work(1), image_work(2), image_work(3), image_work(4)]),
            ),
        ),
    ]);

    let request = SubmitRequest::new(GenerationType::TextToImage)
        .with_argument(Argument::prompt("lighthouse at dusk"))
        .with_argument(Argument::aspect_ratio("16:9"))
        .with_argument(Argument::image_count(4))
        .with_argument(Argument::biz());
    let submission = submit(&transport, BASE, &request).await.unwrap();
    assert_eq!(submission.task_id(), 600);
    assert_eq!(submission.limitation.as_ref().unwrap().remaining, 9);

    let mut observed = Vec::new();
    let done = track_until_done_with(
        &transport,
        BASE,
        submission.task_id(),
        &PollConfig::default(),
        &CancelFlag::new(),
        |snapshot| observed.push(snapshot.status),
    )
    .await
    .unwrap();

    assert_eq!(observed, [TaskStatus::Queuing, TaskStatus::Completed]);
    assert_eq!(done.works.len(), 4);
    assert!(done.works.iter().all(|work| work.url().is_some()));
    assert_eq!(transport.calls(), 3);
    assert_eq!(
        transport.request(1).url,
        format!("{BASE}/api/task/status?taskId=600")
    );
}

#[tokio::test(start_paused = true)]
async fn uploaded_reference_feeds_an_image_to_video_job() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&vec![7u8; 2 * 1024 * 1024]).unwrap();

    let transport = ScriptedTransport::new(&[
        (
            200,
            json!({
                "status": 200,
                "message": "",
                "data": {"token": "tok-1", "httpEndpoints": ["upload.test"]},
            }),
        ),
        (200, json!({"result": 1, "existed": false})),
        (200, json!({"result": 1})),
        (200, json!({"result": 1})),
        (
            200,
            json!({
                "status": 200,
                "message": "",
                "data": {"url": "https://cdn.test/ref.png"},
            }),
        ),
        (200, accepted_submit(601, "m2v_img2video_hq")),
        (200, snapshot(10, json!([]))),
        (200, snapshot(99, json!([video_work(601)]))),
    ]);

    let mut steps = Vec::new();
    let url = upload_with_progress(&transport, BASE, file.path(), |step| steps.push(step))
        .await
        .unwrap();
    assert_eq!(url, "https://cdn.test/ref.png");
    assert_eq!(
        steps,
        [
            UploadStep::IssueToken,
            UploadStep::Resume,
            UploadStep::Fragment,
            UploadStep::Complete,
            UploadStep::Verify,
        ]
    );

    // The handshake talks to the issued endpoint without the session cookie;
    // only token issue and verify go to the API host with it.
    let issue = transport.request(0);
    assert!(issue.credential);
    assert!(
        issue
            .url
            .starts_with(&format!("{BASE}/api/upload/issue/token?filename="))
    );
    let fragment = transport.request(2);
    assert!(!fragment.credential);
    assert_eq!(
        fragment.url,
        "https://upload.test/api/upload/fragment?upload_token=tok-1&fragment_id=0"
    );
    match &fragment.body {
        Body::Octets(bytes) => assert_eq!(bytes.len(), 2 * 1024 * 1024),
        other => panic!("expected raw bytes, got {other:?}"),
    }
    let complete = transport.request(3);
    assert_eq!(
        complete.url,
        "https://upload.test/api/upload/complete?fragment_count=1&upload_token=tok-1"
    );
    let verify = transport.request(4);
    assert!(verify.credential);
    assert_eq!(verify.url, format!("{BASE}/api/upload/verify/token?token=tok-1"));

    let request = SubmitRequest::new(GenerationType::ImageToVideo.high_quality())
        .with_argument(Argument::prompt("push in slowly"))
        .with_argument(Argument::cfg(0.5))
        .with_argument(Argument::duration(5))
        .with_argument(Argument::biz())
        .with_argument(Argument::tail_image(false))
        .with_input(TaskInput::url(url));
    let submission = submit(&transport, BASE, &request).await.unwrap();

    let sent = transport.request(5);
    match &sent.body {
        Body::Json(value) => {
            assert_eq!(value["type"], "m2v_img2video_hq");
            assert_eq!(value["inputs"][0]["inputType"], "URL");
            assert_eq!(value["inputs"][0]["url"], "https://cdn.test/ref.png");
            let arguments = value["arguments"].as_array().unwrap();
            assert!(
                arguments
                    .iter()
                    .any(|a| a["name"] == "tail_image_enabled" && a["value"] == "false")
            );
        }
        other => panic!("expected a JSON body, got {other:?}"),
    }

    let done = track_until_done_with(
        &transport,
        BASE,
        submission.task_id(),
        &PollConfig::video(),
        &CancelFlag::new(),
        |_| {},
    )
    .await
    .unwrap();
    assert_eq!(done.works.len(), 1);
    assert_eq!(done.works[0].url(), Some("https://cdn.test/clip.mp4"));
    assert_eq!(transport.calls(), 8);
}

#[tokio::test]
async fn moderated_prompts_short_circuit_before_any_job_exists() {
    for (code, expected) in [(7, ModerationCategory::Text), (8, ModerationCategory::Image)] {
        let transport = ScriptedTransport::new(&[(
            200,
            json!({
                "status": 200,
                "message": "",
                "data": {
                    "status": code,
                    "message": "content policy refusal",
                    "task": {"id": 0, "status": code},
                    "works": [],
                },
            }),
        )]);

        let request = SubmitRequest::new(GenerationType::TextToImage)
            .with_argument(Argument::prompt("something disallowed"))
            .with_argument(Argument::biz());
        let err = submit(&transport, BASE, &request).await.unwrap_err();
        match err {
            Error::ContentRejected { category, reason } => {
                assert_eq!(category, expected);
                assert_eq!(reason, "content policy refusal");
            }
            other => panic!("expected ContentRejected, got {other}"),
        }
        assert_eq!(transport.calls(), 1);
    }
}
