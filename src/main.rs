//! MotionCam - Single-Camera Motion Detection and Recording
//!
//! Main entry point: wires the capture, detection, recording and alert
//! components into the producer pipeline and runs until Ctrl-C.

use motioncam::{
    broadcast_buffer::FrameBroadcastBuffer,
    clip_store::ClipStore,
    config::AppConfig,
    frame_source::FfmpegFrameSource,
    motion_detector::{DetectorConfig, MotionDetector},
    notification_gate::{AlertDispatcher, LogDispatcher, NotificationGate, PushoverDispatcher},
    persistence_tracker::PersistenceTracker,
    pipeline::MotionPipeline,
    recording_controller::{
        FfmpegSinkFactory, FfmpegThumbnailer, RecordingConfig, RecordingController,
    },
    retention_manager::RetentionManager,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "motioncam=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting MotionCam v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        capture_input = %config.capture_input,
        frame_width = config.frame_width,
        frame_height = config.frame_height,
        video_dir = %config.video_dir.display(),
        thumbnail_dir = %config.thumbnail_dir.display(),
        "Configuration loaded"
    );

    let store = Arc::new(ClipStore::new(config.video_dir.clone(), config.thumbnail_dir.clone()).await?);
    tracing::info!("ClipStore initialized");

    // Enforce the retention cap left over from the previous run
    let retention = RetentionManager::new(store.clone(), config.retention_cap);
    let kept = retention.prune().await?;
    tracing::info!(clips = kept.len(), "Startup retention prune complete");

    let broadcast = Arc::new(FrameBroadcastBuffer::new());

    let source = Box::new(FfmpegFrameSource::new(
        config.capture_input.clone(),
        config.frame_width,
        config.frame_height,
    ));

    let detector = MotionDetector::new(DetectorConfig {
        roi: config.roi,
        reference_swap_frames: config.reference_swap_frames,
        blur_sigma: config.blur_sigma,
        diff_threshold: config.diff_threshold,
        dilate_iterations: config.dilate_iterations,
        min_area: config.min_motion_area,
    });
    let tracker = PersistenceTracker::new(config.persistence_frames);

    let controller = RecordingController::new(
        store.clone(),
        Arc::new(FfmpegSinkFactory),
        Arc::new(FfmpegThumbnailer::new(
            config.thumbnail_width,
            config.thumbnail_height,
        )),
        RecordingConfig {
            duration: config.record_duration(),
            fps: config.sink_fps,
            width: config.frame_width,
            height: config.frame_height,
        },
    );

    let dispatcher: Arc<dyn AlertDispatcher> =
        match (config.pushover_token.clone(), config.pushover_user.clone()) {
            (Some(token), Some(user)) => {
                tracing::info!("Pushover alerts enabled");
                Arc::new(PushoverDispatcher::new(token, user))
            }
            _ => {
                tracing::info!("Pushover credentials not set, alerts logged only");
                Arc::new(LogDispatcher)
            }
        };
    let gate = NotificationGate::new(dispatcher, config.notify_cooldown());

    let pipeline = MotionPipeline::new(broadcast);
    pipeline
        .start(config, source, detector, tracker, controller, gate)
        .await;
    tracing::info!("Motion pipeline started");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    pipeline.stop().await;

    Ok(())
}
