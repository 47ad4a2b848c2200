//! MotionPipeline - The Frame-Processing Producer Loop
//!
//! ## Responsibilities
//!
//! - Own the single long-lived producer: capture -> sample -> detect ->
//!   track -> record -> notify -> annotate -> publish
//! - Bound CPU usage with a small fixed delay per processed iteration
//! - Escalate a run of consecutive capture failures to a pipeline stop
//! - On stop, close any open recording session before exiting
//!
//! All mutable pipeline state (detector, tracker, controller, gate) is
//! moved into the spawned task and never shared; the only shared state is
//! the broadcast buffer.

use crate::broadcast_buffer::FrameBroadcastBuffer;
use crate::config::AppConfig;
use crate::frame_source::FrameSource;
use crate::motion_detector::MotionDetector;
use crate::notification_gate::{Alert, NotificationGate};
use crate::overlay;
use crate::persistence_tracker::PersistenceTracker;
use crate::recording_controller::RecordingController;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// MotionPipeline instance
pub struct MotionPipeline {
    broadcast: Arc<FrameBroadcastBuffer>,
    running: Arc<RwLock<bool>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl MotionPipeline {
    /// Create a pipeline publishing into the given broadcast buffer
    pub fn new(broadcast: Arc<FrameBroadcastBuffer>) -> Self {
        Self {
            broadcast,
            running: Arc::new(RwLock::new(false)),
            handle: Mutex::new(None),
        }
    }

    /// Whether the producer task is active
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Start the producer task, taking ownership of the processing stages
    pub async fn start(
        &self,
        config: AppConfig,
        source: Box<dyn FrameSource>,
        detector: MotionDetector,
        tracker: PersistenceTracker,
        controller: RecordingController,
        gate: NotificationGate,
    ) {
        {
            let mut running = self.running.write().await;
            if *running {
                tracing::warn!("Pipeline already running");
                return;
            }
            *running = true;
        }

        tracing::info!("Starting motion pipeline");

        let broadcast = self.broadcast.clone();
        let running = self.running.clone();
        let task = tokio::spawn(run_loop(
            config, source, detector, tracker, controller, gate, broadcast, running,
        ));
        *self.handle.lock().await = Some(task);
    }

    /// Stop the producer and wait for it to close any open session
    pub async fn stop(&self) {
        {
            let mut running = self.running.write().await;
            *running = false;
        }
        tracing::info!("Stopping motion pipeline");

        if let Some(task) = self.handle.lock().await.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Pipeline task join failed");
            }
        }
    }

    /// Wait for the producer to finish on its own (capture escalation)
    pub async fn join(&self) {
        if let Some(task) = self.handle.lock().await.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Pipeline task join failed");
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_loop(
    config: AppConfig,
    mut source: Box<dyn FrameSource>,
    mut detector: MotionDetector,
    mut tracker: PersistenceTracker,
    mut controller: RecordingController,
    mut gate: NotificationGate,
    broadcast: Arc<FrameBroadcastBuffer>,
    running: Arc<RwLock<bool>>,
) {
    let mut frame_count: u64 = 0;
    let mut consecutive_failures: u32 = 0;
    let sample_interval = config.frame_sample_interval.max(1);

    loop {
        if !*running.read().await {
            break;
        }

        let frame = match source.next_frame().await {
            Ok(frame) => {
                consecutive_failures = 0;
                frame
            }
            Err(e) => {
                consecutive_failures += 1;
                tracing::warn!(
                    error = %e,
                    consecutive_failures,
                    "Frame capture failed, skipping"
                );
                if consecutive_failures >= config.max_capture_failures {
                    tracing::error!(
                        failures = consecutive_failures,
                        "Capture failure run exceeded limit, stopping pipeline"
                    );
                    break;
                }
                tokio::time::sleep(config.loop_delay()).await;
                continue;
            }
        };

        // Fixed sampling ratio bounds detection cost
        frame_count += 1;
        if frame_count % sample_interval != 0 {
            continue;
        }

        let detection = match detector.process(&frame) {
            Ok(detection) => detection,
            Err(e) => {
                tracing::warn!(error = %e, "Frame rejected by detector, skipping");
                continue;
            }
        };
        let motion = detection.event.is_some();
        tracker.observe(motion);

        // Annotate once; the same composited frame is recorded and published
        let mut annotated = frame;
        let status = if tracker.is_active() {
            format!("MOVEMENT DETECTED {}", tracker.remaining())
        } else {
            "NO MOVEMENT DETECTED".to_string()
        };
        overlay::annotate(
            &mut annotated.image,
            &config.roi,
            detection.event.as_ref(),
            &detection.delta,
            &status,
        );

        let now = Instant::now();
        if let Err(e) = controller.handle_frame(now, motion, &annotated).await {
            tracing::error!(error = %e, "Recording error");
        }

        if motion {
            let alert = Alert {
                message: "Movement detected!".to_string(),
                title: Some("Security Alert".to_string()),
                link: config.stream_url.clone(),
            };
            gate.on_motion(now, alert).await;
        }

        broadcast.publish(annotated).await;
        tokio::time::sleep(config.loop_delay()).await;
    }

    // Never leave an unflushed sink behind
    if let Err(e) = controller.shutdown().await {
        tracing::error!(error = %e, "Failed to close recording session on shutdown");
    }

    {
        let mut running = running.write().await;
        *running = false;
    }
    tracing::info!("Motion pipeline stopped");
}
