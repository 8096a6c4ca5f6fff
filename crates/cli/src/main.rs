use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use moodcam_core::annotation::infrastructure::box_annotator::BoxAnnotator;
use moodcam_core::detection::infrastructure::scripted_detector::ScriptedDetector;
use moodcam_core::persistence::domain::session_store::UserId;
use moodcam_core::persistence::infrastructure::json_session_store::JsonSessionStore;
use moodcam_core::{Emotion, EmotionPipeline, Frame};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "webp"];

/// Replay recorded face detections over a frame source through the
/// emotion-monitoring pipeline.
#[derive(Parser)]
#[command(name = "moodcam")]
struct Cli {
    /// JSON detection script mapping frame numbers to face observations.
    script: PathBuf,

    /// Directory of image frames, replayed in sorted filename order.
    /// Without it, synthetic gray frames are generated.
    #[arg(long)]
    frames: Option<PathBuf>,

    /// Number of synthetic frames when no --frames directory is given.
    #[arg(long, default_value = "30")]
    synthetic_frames: u64,

    /// Synthetic frame size as WIDTHxHEIGHT.
    #[arg(long, default_value = "640x480")]
    size: String,

    /// Data directory for session records, emotion logs, and global stats.
    #[arg(long, default_value = "moodcam-data")]
    data_dir: PathBuf,

    /// User id the session is attributed to.
    #[arg(long, default_value = "1")]
    user: i64,

    /// Write the last annotated frame to this PNG path.
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let detector = ScriptedDetector::from_json(&fs::read_to_string(&cli.script)?)?;
    let store = Arc::new(JsonSessionStore::open(&cli.data_dir)?);
    let pipeline = EmotionPipeline::new(
        Box::new(detector),
        Box::new(BoxAnnotator::new()),
        store.clone(),
    );

    if !pipeline.start_session(UserId(cli.user)) {
        return Err("a session is already active".into());
    }

    let frames = match &cli.frames {
        Some(dir) => load_frames(dir)?,
        None => synthetic_frames(&cli.size, cli.synthetic_frames)?,
    };
    let frame_count = frames.len();
    log::info!("replaying {frame_count} frames through the pipeline");
    for frame in frames {
        pipeline.submit_frame(frame);
    }

    wait_for_drain(&pipeline);

    let summary = pipeline.emotion_summary();
    println!("Processed {frame_count} frames, {} faces:", summary.total_faces());
    for (emotion, count) in summary.iter() {
        println!("  {emotion:8} {count}");
    }
    println!("Session dominant emotion: {}", summary.dominant());

    if let Some(path) = &cli.snapshot {
        save_snapshot(&pipeline, path)?;
    }

    pipeline.stop_session();

    let aggregate = store.global_aggregate()?;
    println!(
        "All-time: {} sessions, {} faces, most common {}",
        aggregate.total_sessions,
        aggregate.total_faces_detected,
        aggregate
            .most_common_emotion
            .map_or("n/a", Emotion::as_str)
    );

    Ok(())
}

fn load_frames(dir: &Path) -> Result<Vec<Frame>, Box<dyn std::error::Error>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        })
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(format!("no image frames found in {}", dir.display()).into());
    }

    let mut frames = Vec::with_capacity(paths.len());
    for (sequence, path) in paths.iter().enumerate() {
        let rgb = image::open(path)?.to_rgb8();
        let (width, height) = rgb.dimensions();
        frames.push(Frame::new(rgb.into_raw(), width, height, 3, sequence as u64));
    }
    Ok(frames)
}

fn synthetic_frames(size: &str, count: u64) -> Result<Vec<Frame>, Box<dyn std::error::Error>> {
    let (width, height) = parse_size(size)?;
    Ok((0..count)
        .map(|sequence| {
            Frame::new(
                vec![128u8; (width * height * 3) as usize],
                width,
                height,
                3,
                sequence,
            )
        })
        .collect())
}

fn parse_size(size: &str) -> Result<(u32, u32), Box<dyn std::error::Error>> {
    let (w, h) = size
        .split_once('x')
        .ok_or("size must be WIDTHxHEIGHT, e.g. 640x480")?;
    Ok((w.parse()?, h.parse()?))
}

/// Blocks until the queue is drained and the summary has settled.
///
/// The pipeline exposes no completion signal (it is built for endless live
/// feeds), so the harness polls: queue empty, then two identical summary
/// snapshots one interval apart.
fn wait_for_drain(pipeline: &EmotionPipeline) {
    loop {
        if pipeline.pending_frames() == 0 {
            let before = pipeline.emotion_summary();
            std::thread::sleep(Duration::from_millis(150));
            if pipeline.pending_frames() == 0 && pipeline.emotion_summary() == before {
                return;
            }
        } else {
            std::thread::sleep(Duration::from_millis(50));
        }
    }
}

fn save_snapshot(
    pipeline: &EmotionPipeline,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let frame = pipeline
        .latest_frame()
        .ok_or("no processed frame available for snapshot")?;
    let buffer: image::RgbImage =
        image::ImageBuffer::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or("frame buffer does not match its dimensions")?;
    buffer.save(path)?;
    println!("Snapshot written to {}", path.display());
    Ok(())
}
