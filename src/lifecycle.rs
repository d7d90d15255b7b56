//! Pipeline lifecycle across service connect/disconnect transitions.
//!
//! Each `start` builds one *generation* of the pipeline: event tracker,
//! screenshot bridge, dispatcher, and gate, wired together and owned as a
//! unit. Starting again first tears the previous generation down completely
//! (worker stopped, outstanding capture cancelled, tracker cleared), so a
//! service reconnect never leaks a stale dispatcher or worker.

use crate::config::Config;
use crate::device::DeviceConfigSource;
use crate::dispatcher::ScanRequestDispatcher;
use crate::event_tracker::EventTracker;
use crate::gate::{DispatcherSlot, SynchronizedDispatcher};
use crate::scanners::{enabled_scanners, Scanner};
use crate::screenshot::{CaptureSource, ScreenshotBridge};
use crate::serializer::ResultSerializer;
use crate::types::{DispatchError, ScanRequest, ScanResult, UiEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::info;

/// Failures that are fatal to one lifecycle generation
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("screenshot worker context unavailable: no async runtime")]
    WorkerContextUnavailable,
}

struct Generation {
    tracker: Arc<EventTracker>,
    bridge: Arc<ScreenshotBridge>,
}

/// Caller-facing handle to one pipeline generation.
///
/// A handle from a torn-down generation stays safe to use: its dispatches
/// fail with `CaptureFailed(Cancelled)` instead of touching new-generation
/// state.
#[derive(Clone)]
pub struct PipelineHandle {
    tracker: Arc<EventTracker>,
    dispatcher: Arc<SynchronizedDispatcher>,
    device: Arc<DeviceConfigSource>,
}

impl PipelineHandle {
    /// Feed a platform accessibility event (non-blocking)
    pub fn on_event(&self, event: &UiEvent) {
        self.tracker.on_event(event);
    }

    /// Run one scan through the single-flight gate
    pub async fn dispatch(&self, request: ScanRequest) -> Result<ScanResult, DispatchError> {
        self.dispatcher.dispatch(request).await
    }

    /// Current admission state of the gate
    pub fn slot(&self) -> DispatcherSlot {
        self.dispatcher.slot()
    }

    /// Device configuration source (orientation updates go through here)
    pub fn device(&self) -> &DeviceConfigSource {
        &self.device
    }
}

/// Owns setup/teardown of the scan pipeline
pub struct PipelineLifecycleManager {
    config: Config,
    device: Arc<DeviceConfigSource>,
    current: Option<Generation>,
}

impl PipelineLifecycleManager {
    pub fn new(config: Config, device: Arc<DeviceConfigSource>) -> Self {
        Self {
            config,
            device,
            current: None,
        }
    }

    /// Construct a new pipeline generation.
    ///
    /// Any live generation is fully torn down first; no two generations'
    /// worker contexts ever coexist. Repeated calls are leak-free.
    pub async fn start(
        &mut self,
        source: Arc<dyn CaptureSource>,
        scanners: Vec<Arc<dyn Scanner>>,
    ) -> Result<PipelineHandle, LifecycleError> {
        self.stop().await;

        let handle =
            Handle::try_current().map_err(|_| LifecycleError::WorkerContextUnavailable)?;

        let tracker = Arc::new(EventTracker::new());
        let bridge = Arc::new(ScreenshotBridge::new(
            source,
            Duration::from_millis(self.config.capture.timeout_ms),
            self.config.capture.command_depth,
            &handle,
        ));

        let scanners = enabled_scanners(scanners, &self.config.scanners);
        let dispatcher = Arc::new(SynchronizedDispatcher::new(Arc::new(
            ScanRequestDispatcher::new(
                tracker.clone(),
                bridge.clone(),
                self.device.clone(),
                scanners,
                ResultSerializer::new(),
            ),
        )));

        self.current = Some(Generation {
            tracker: tracker.clone(),
            bridge,
        });
        info!("pipeline generation started");

        Ok(PipelineHandle {
            tracker,
            dispatcher,
            device: self.device.clone(),
        })
    }

    /// Tear down the current generation. Idempotent.
    pub async fn stop(&mut self) {
        if let Some(generation) = self.current.take() {
            generation.bridge.teardown().await;
            generation.tracker.clear();
            info!("pipeline generation stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }
}
