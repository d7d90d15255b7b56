//! Scan Service - Main entry point
//!
//! Runs the scan pipeline as a standalone daemon against a simulated
//! platform: a synthetic event feed and a capture source that delivers
//! frames from a background thread, the way the real screenshot API does.
//! Host integrations embed the library instead and plug in the platform
//! event stream, capture source, and rule engines at the lifecycle seam.

use accessibility_scanner::{
    CaptureFailure, CompletionFn, Config, DeviceConfigSource, DispatchError, DisplayMetrics,
    EventKind, NodeBounds, Orientation, PipelineLifecycleManager, ScanRequest, ScanTriggerPolicy,
    UiEvent, UiNode, WindowId,
};
use image::{DynamicImage, Rgba, RgbaImage};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Capture source standing in for the platform projection API.
///
/// Completions arrive from a separate thread after a short delay, so the
/// bridge's cross-thread handoff is exercised for real.
struct SimulatedCaptureSource;

impl accessibility_scanner::CaptureSource for SimulatedCaptureSource {
    fn capture(&self, on_complete: CompletionFn) {
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            let frame = RgbaImage::from_pixel(1080, 1920, Rgba([32, 32, 32, 255]));
            on_complete(Ok(DynamicImage::ImageRgba8(frame)));
        });
    }
}

fn synthetic_event(window_id: WindowId) -> UiEvent {
    UiEvent {
        window_id,
        kind: EventKind::WindowStateChanged,
        timestamp: chrono::Utc::now(),
        root: Some(Arc::new(UiNode {
            id: window_id as u64,
            role: "frame".to_string(),
            text: Some(format!("window {}", window_id)),
            bounds: NodeBounds::new(0, 0, 1080, 1920),
            children: vec![],
        })),
        package: Some("com.example.demo".to_string()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.general.log_level.clone())),
        )
        .with_target(false)
        .init();

    info!("Starting scan service");

    if !config.general.enabled {
        info!("Agent is disabled in configuration, exiting");
        return Ok(());
    }

    // The host service supplies real display metrics; the daemon runs
    // against a fixed portrait display.
    let device = Arc::new(DeviceConfigSource::new(
        || DisplayMetrics {
            width: 1080,
            height: 1920,
            density: 2.0,
        },
        Orientation::Portrait,
    ));

    let policy = ScanTriggerPolicy::new(&config.trigger);
    let mut manager = PipelineLifecycleManager::new(config.clone(), device.clone());

    // No rule engines are bundled here; embedders register theirs.
    let handle = manager
        .start(Arc::new(SimulatedCaptureSource), vec![])
        .await?;

    info!("Scan service running, press Ctrl-C to stop");

    let mut ticker = tokio::time::interval(Duration::from_secs(2));
    let mut window: WindowId = 1;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                let event = synthetic_event(window);
                handle.on_event(&event);

                if policy.should_trigger(&event) {
                    match handle.dispatch(ScanRequest::default()).await {
                        Ok(result) => info!(
                            "scan of window {} complete: {} scanner outcome(s), {} byte payload",
                            result.metadata.window_id,
                            result.outcomes.len(),
                            result.payload.len()
                        ),
                        Err(DispatchError::Busy) => debug!("scan already in flight, skipping"),
                        Err(DispatchError::CaptureFailed(CaptureFailure::Timeout)) => {
                            warn!("screenshot timed out")
                        }
                        Err(e) => warn!("scan failed: {}", e),
                    }
                }

                window = if window == 1 { 2 } else { 1 };
            }
        }
    }

    manager.stop().await;
    info!("Scan service stopped");
    Ok(())
}
