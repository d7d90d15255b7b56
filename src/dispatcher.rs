//! Scan request dispatching.
//!
//! One dispatch acquires a temporally coherent snapshot (active-window root,
//! fresh screenshot, current device configuration), runs the configured
//! scanners against it, and serializes their outcomes into a result for the
//! caller. Nothing is cached across dispatches, so a request never observes
//! state older than its own start.

use crate::device::{DeviceConfig, DeviceConfigSource};
use crate::event_tracker::EventTracker;
use crate::scanners::Scanner;
use crate::screenshot::ScreenshotBridge;
use crate::serializer::ResultSerializer;
use crate::types::{
    DispatchError, ScanRequest, ScanResult, ScannerOutcome, SnapshotMetadata, UiNode,
};
use image::DynamicImage;
use std::sync::Arc;
use tracing::{debug, warn};

/// Immutable scanner input, scoped to one dispatch
pub struct ScanSnapshot {
    pub root: Arc<UiNode>,
    pub screenshot: DynamicImage,
    pub device: DeviceConfig,
}

/// Assembles snapshots and runs scanners for one pipeline generation
pub struct ScanRequestDispatcher {
    tracker: Arc<EventTracker>,
    bridge: Arc<ScreenshotBridge>,
    device: Arc<DeviceConfigSource>,
    scanners: Vec<Arc<dyn Scanner>>,
    serializer: ResultSerializer,
}

impl ScanRequestDispatcher {
    pub fn new(
        tracker: Arc<EventTracker>,
        bridge: Arc<ScreenshotBridge>,
        device: Arc<DeviceConfigSource>,
        scanners: Vec<Arc<dyn Scanner>>,
        serializer: ResultSerializer,
    ) -> Self {
        Self {
            tracker,
            bridge,
            device,
            scanners,
            serializer,
        }
    }

    /// Run one scan against the current UI state.
    ///
    /// A scanner failure does not abort the dispatch: findings from the
    /// scanners that succeeded are returned alongside a record of which
    /// failed. Only when every selected scanner fails does the dispatch
    /// itself fail with `ScannerFailed`.
    pub async fn dispatch(&self, request: ScanRequest) -> Result<ScanResult, DispatchError> {
        let window = self.tracker.snapshot()?;
        debug!(
            "dispatch started for window {} ({} nodes)",
            window.window_id,
            window.root.node_count()
        );

        let screenshot = self.bridge.request_capture().await?;

        let device = self.device.current();
        let snapshot = ScanSnapshot {
            root: window.root,
            screenshot,
            device,
        };

        let mut outcomes = Vec::with_capacity(self.scanners.len());
        for scanner in self
            .scanners
            .iter()
            .filter(|s| request.rules.includes(s.id()))
        {
            match scanner.scan(&snapshot).await {
                Ok(findings) => {
                    debug!("scanner '{}' reported {} finding(s)", scanner.id(), findings.len());
                    outcomes.push(ScannerOutcome::ok(scanner.id(), findings));
                }
                Err(e) => {
                    warn!("scanner '{}' failed: {}", scanner.id(), e);
                    outcomes.push(ScannerOutcome::failed(scanner.id(), e.to_string()));
                }
            }
        }

        if !outcomes.is_empty() && outcomes.iter().all(ScannerOutcome::is_failure) {
            let first = outcomes.remove(0);
            return Err(DispatchError::ScannerFailed {
                id: first.scanner,
                reason: first.error.unwrap_or_default(),
            });
        }

        let metadata = SnapshotMetadata {
            window_id: window.window_id,
            screen_width: device.screen_width,
            screen_height: device.screen_height,
            orientation: device.orientation,
            timestamp: chrono::Utc::now().timestamp_millis(),
        };

        let payload = self
            .serializer
            .serialize(&outcomes, &metadata, request.format)?;

        Ok(ScanResult {
            outcomes,
            metadata,
            payload,
        })
    }
}
