//! Command-line client for the Kling generative-media service.
//!
//! Generates images and videos, tracks jobs to completion, uploads reference
//! images, and deletes jobs or works. Reads the session cookie from the
//! `KLING_COOKIE` environment variable unless `--cookie` is given.
//!
//! # Examples
//!
//! ```sh
//! # Text to image, four outputs, tracked until done
//! kling image --prompt "corgi astronaut, oil on canvas" --count 4
//!
//! # Image to video from a local reference, high quality
//! kling video --prompt "slow dolly in" --image face.png --hq
//!
//! # One status snapshot, or follow until terminal
//! kling status 12345
//! kling status 12345 --watch
//!
//! # Upload only; prints the verified URL
//! kling upload face.png
//! ```

use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use chrono::TimeZone;
use clap::{Parser, Subcommand};
use kling_rs::prelude::*;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Command-line client for the Kling generative-media service.
#[derive(Parser)]
#[command(name = "kling", version)]
struct Cli {
    /// Session cookie; falls back to the KLING_COOKIE environment variable
    #[arg(long, global = true)]
    cookie: Option<String>,

    /// Override the API host
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Log polling and upload progress at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate images from a prompt, optionally guided by a reference image
    Image {
        /// Prompt text; doubles as the job title
        #[arg(long)]
        prompt: String,

        /// Style preset name
        #[arg(long)]
        style: Option<String>,

        /// Output aspect ratio
        #[arg(long, default_value = "1:1")]
        aspect_ratio: String,

        /// Number of images to generate
        #[arg(long, default_value_t = 4)]
        count: u32,

        /// Local reference image; switches to image-to-image generation
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Reference adherence, 0.0..=1.0. Only used with --reference
        #[arg(long, default_value_t = 0.5)]
        fidelity: f64,

        /// Seconds between status checks
        #[arg(long)]
        interval: Option<u64>,

        /// Maximum number of status checks
        #[arg(long)]
        attempts: Option<u32>,
    },

    /// Generate a video clip from a prompt or a reference image
    Video {
        /// Prompt text; doubles as the job title
        #[arg(long)]
        prompt: String,

        /// Things the clip should avoid
        #[arg(long)]
        negative_prompt: Option<String>,

        /// Local reference image; switches to image-to-video generation
        #[arg(long)]
        image: Option<PathBuf>,

        /// Prompt-adherence weight, 0.0..=1.0
        #[arg(long, default_value_t = 0.5)]
        cfg: f64,

        /// Clip length in seconds
        #[arg(long, default_value_t = 5)]
        duration: u32,

        /// Use the high-quality variant
        #[arg(long)]
        hq: bool,

        /// Camera movement for text-to-video: down-back, forward-up,
        /// right-turn-forward, left-turn-forward, horizontal, vertical,
        /// zoom, tilt, pan, or roll
        #[arg(long)]
        camera: Option<String>,

        /// Magnitude for single-axis camera movements, -10.0..=10.0
        #[arg(long, default_value_t = 5.0)]
        camera_amount: f64,

        /// Treat the reference as the clip's final frame
        #[arg(long)]
        tail: bool,

        /// Seconds between status checks (default 30 for video)
        #[arg(long)]
        interval: Option<u64>,

        /// Maximum number of status checks
        #[arg(long)]
        attempts: Option<u32>,
    },

    /// Fetch a job's status once, or follow it until terminal
    Status {
        /// Job id as printed at submission
        task_id: i64,

        /// Keep polling until the job reaches a terminal state
        #[arg(long)]
        watch: bool,

        /// Seconds between status checks
        #[arg(long)]
        interval: Option<u64>,

        /// Maximum number of status checks
        #[arg(long)]
        attempts: Option<u32>,
    },

    /// Upload a local file and print its verified resource URL
    Upload {
        /// File to upload
        file: PathBuf,
    },

    /// Delete jobs or individual works
    Delete {
        /// Job id to delete; repeatable
        #[arg(long = "task")]
        tasks: Vec<i64>,

        /// Work to delete as TASK_ID:WORK_ID; repeatable
        #[arg(long = "work", value_parser = parse_work_ref)]
        works: Vec<WorkRef>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(tracing_subscriber::filter::LevelFilter::from_level(level))
        .init();

    let cookie = match cli.cookie.or_else(|| std::env::var("KLING_COOKIE").ok()) {
        Some(cookie) => cookie,
        None => {
            eprintln!("Error: set KLING_COOKIE or pass --cookie");
            process::exit(1);
        }
    };

    let client = match KlingClient::new(cookie) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: failed to build client: {e}");
            process::exit(1);
        }
    };
    let client = match cli.api_base {
        Some(base) => client.with_api_base(base),
        None => client,
    };

    if let Err(e) = run(&client, cli.command).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run(client: &KlingClient, command: Command) -> Result<()> {
    match command {
        Command::Image {
            prompt,
            style,
            aspect_ratio,
            count,
            reference,
            fidelity,
            interval,
            attempts,
        } => {
            let (task_type, input) = match &reference {
                Some(path) => {
                    let url = upload_and_report(client, path).await?;
                    (GenerationType::ImageToImage, Some(TaskInput::url(url)))
                }
                None => (GenerationType::TextToImage, None),
            };

            let mut request =
                SubmitRequest::new(task_type).with_argument(Argument::prompt(prompt));
            if let Some(style) = style {
                request = request.with_argument(Argument::style(style));
            }
            request = request
                .with_argument(Argument::aspect_ratio(aspect_ratio))
                .with_argument(Argument::image_count(count))
                .with_argument(Argument::biz());
            if reference.is_some() {
                request = request.with_argument(Argument::fidelity(fidelity));
            }
            if let Some(input) = input {
                request = request.with_input(input);
            }

            let config = poll_config(PollConfig::default(), interval, attempts);
            generate(client, request, &config).await
        }

        Command::Video {
            prompt,
            negative_prompt,
            image,
            cfg,
            duration,
            hq,
            camera,
            camera_amount,
            tail,
            interval,
            attempts,
        } => {
            let (task_type, input) = match &image {
                Some(path) => {
                    let url = upload_and_report(client, path).await?;
                    (GenerationType::ImageToVideo, Some(TaskInput::url(url)))
                }
                None => (GenerationType::TextToVideo, None),
            };
            let task_type = if hq { task_type.high_quality() } else { task_type };

            let mut request =
                SubmitRequest::new(task_type).with_argument(Argument::prompt(prompt));
            if let Some(negative) = negative_prompt {
                request = request.with_argument(Argument::negative_prompt(negative));
            }
            request = request
                .with_argument(Argument::cfg(cfg))
                .with_argument(Argument::duration(duration))
                .with_argument(Argument::biz());

            // Camera directives only apply to text-to-video jobs.
            if image.is_none() {
                if let Some(name) = camera {
                    let Some(movement) = parse_camera(&name) else {
                        eprintln!("Error: unknown camera movement '{name}'");
                        process::exit(2);
                    };
                    let control = CameraControl::axis(movement, camera_amount);
                    request = request.with_argument(Argument::camera(&control));
                }
            } else {
                request = request.with_argument(Argument::tail_image(tail));
            }
            if let Some(input) = input {
                request = request.with_input(input);
            }

            let config = poll_config(PollConfig::video(), interval, attempts);
            generate(client, request, &config).await
        }

        Command::Status {
            task_id,
            watch,
            interval,
            attempts,
        } => {
            if watch {
                let config = poll_config(PollConfig::default(), interval, attempts);
                let done = client
                    .track_until_done_with(task_id, &config, &CancelFlag::new(), print_snapshot)
                    .await?;
                print_works(&done.works);
            } else {
                let snapshot = client.task_status(task_id).await?;
                print_snapshot(&snapshot);
                print_works(&snapshot.works);
            }
            Ok(())
        }

        Command::Upload { file } => {
            let url = client
                .upload_with_progress(&file, |step| println!("  {step} done"))
                .await?;
            println!("{url}");
            Ok(())
        }

        Command::Delete { tasks, works } => {
            if tasks.is_empty() && works.is_empty() {
                eprintln!("nothing to delete: pass --task and/or --work");
                process::exit(2);
            }
            if !tasks.is_empty() {
                client.delete_tasks(&tasks).await?;
                println!("deleted {} task(s)", tasks.len());
            }
            if !works.is_empty() {
                client.delete_works(&works).await?;
                println!("deleted {} work(s)", works.len());
            }
            Ok(())
        }
    }
}

/// Submits, tracks to completion, and prints the produced works.
async fn generate(client: &KlingClient, request: SubmitRequest, config: &PollConfig) -> Result<()> {
    let title = request.title().unwrap_or("untitled").to_string();
    let submission = client.submit(&request).await?;
    println!("task {} submitted ({title})", submission.task_id());
    if let Some(limitation) = &submission.limitation {
        println!("quota: {}/{} remaining", limitation.remaining, limitation.limit);
    }

    let done = client
        .track_until_done_with(submission.task_id(), config, &CancelFlag::new(), print_snapshot)
        .await?;
    print_works(&done.works);
    Ok(())
}

async fn upload_and_report(client: &KlingClient, path: &Path) -> Result<String> {
    println!("uploading {}", path.display());
    client
        .upload_with_progress(path, |step| println!("  {step} done"))
        .await
}

fn print_snapshot(snapshot: &StatusSnapshot) {
    if snapshot.eta_time > 0 {
        println!("  {} (eta {}s)", snapshot.status, snapshot.eta_time);
    } else {
        println!("  {}", snapshot.status);
    }
}

fn print_works(works: &[Work]) {
    if works.is_empty() {
        println!("no works produced");
        return;
    }
    for work in works {
        println!(
            "{}  {}  {}",
            work.work_id,
            format_time(work.create_time),
            work.url().unwrap_or("(no resource yet)")
        );
    }
}

fn format_time(epoch_ms: i64) -> String {
    chrono::Local
        .timestamp_millis_opt(epoch_ms)
        .single()
        .map(|time| time.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn poll_config(base: PollConfig, interval: Option<u64>, attempts: Option<u32>) -> PollConfig {
    let config = match interval {
        Some(seconds) => base.with_interval(Duration::from_secs(seconds)),
        None => base,
    };
    match attempts {
        Some(n) => config.with_attempts(n),
        None => config,
    }
}

fn parse_camera(name: &str) -> Option<CameraMovement> {
    let movement = match name {
        "down-back" => CameraMovement::DownBack,
        "forward-up" => CameraMovement::ForwardUp,
        "right-turn-forward" => CameraMovement::RightTurnForward,
        "left-turn-forward" => CameraMovement::LeftTurnForward,
        "horizontal" => CameraMovement::Horizontal,
        "vertical" => CameraMovement::Vertical,
        "zoom" => CameraMovement::Zoom,
        "tilt" => CameraMovement::Tilt,
        "pan" => CameraMovement::Pan,
        "roll" => CameraMovement::Roll,
        _ => return None,
    };
    Some(movement)
}

fn parse_work_ref(raw: &str) -> Result<WorkRef, String> {
    let (task, work) = raw
        .split_once(':')
        .ok_or_else(|| "expected TASK_ID:WORK_ID".to_string())?;
    let task_id = task
        .trim()
        .parse()
        .map_err(|_| format!("bad task id '{task}'"))?;
    let work_id = work
        .trim()
        .parse()
        .map_err(|_| format!("bad work id '{work}'"))?;
    Ok(WorkRef { task_id, work_id })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_refs_parse_from_colon_pairs() {
        assert_eq!(
            parse_work_ref("77:9001"),
            Ok(WorkRef {
                task_id: 77,
                work_id: 9001
            })
        );
        assert!(parse_work_ref("77").is_err());
        assert!(parse_work_ref("77:abc").is_err());
    }

    #[test]
    fn camera_names_map_to_movements() {
        assert_eq!(parse_camera("zoom"), Some(CameraMovement::Zoom));
        assert_eq!(parse_camera("down-back"), Some(CameraMovement::DownBack));
        assert_eq!(parse_camera("dolly"), None);
    }

    #[test]
    fn poll_overrides_apply_on_top_of_the_base() {
        let config = poll_config(PollConfig::video(), Some(10), None);
        assert_eq!(config.interval, Duration::from_secs(10));
        assert_eq!(config.attempts, PollConfig::video().attempts);
    }
}
