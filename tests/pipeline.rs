//! End-to-end pipeline scenarios against a fake platform capture source.

use accessibility_scanner::{
    CaptureFailure, CaptureResult, CaptureSource, CompletionFn, Config, DeviceConfigSource,
    DispatchError, DispatcherSlot, DisplayMetrics, EventKind, Finding, Findings, NodeBounds,
    Orientation, PipelineLifecycleManager, ScanRequest, ScanSnapshot, Scanner,
    ScannerError, Severity, UiEvent, UiNode, WindowId,
};
use async_trait::async_trait;
use image::{DynamicImage, RgbaImage};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Capture source whose completions the test releases by hand
struct FakeSource {
    completions: Mutex<VecDeque<CompletionFn>>,
    captures: AtomicUsize,
}

impl FakeSource {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            completions: Mutex::new(VecDeque::new()),
            captures: AtomicUsize::new(0),
        })
    }

    fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }

    fn complete_next(&self, result: CaptureResult) {
        let callback = self
            .completions
            .lock()
            .unwrap()
            .pop_front()
            .expect("no pending capture");
        callback(result);
    }
}

impl CaptureSource for FakeSource {
    fn capture(&self, on_complete: CompletionFn) {
        self.captures.fetch_add(1, Ordering::SeqCst);
        self.completions.lock().unwrap().push_back(on_complete);
    }
}

/// Scanner that reports one finding naming the root it scanned
struct RootEchoScanner;

#[async_trait]
impl Scanner for RootEchoScanner {
    fn id(&self) -> &str {
        "root-echo"
    }

    async fn scan(&self, snapshot: &ScanSnapshot) -> Result<Findings, ScannerError> {
        Ok(vec![Finding {
            rule: "echo".to_string(),
            severity: Severity::Info,
            message: "scanned".to_string(),
            node_id: Some(snapshot.root.id),
        }])
    }
}

fn manager_with(config: Config) -> PipelineLifecycleManager {
    let device = Arc::new(DeviceConfigSource::new(
        || DisplayMetrics {
            width: 1080,
            height: 1920,
            density: 2.0,
        },
        Orientation::Portrait,
    ));
    PipelineLifecycleManager::new(config, device)
}

fn manager() -> PipelineLifecycleManager {
    manager_with(Config::default())
}

fn event(window_id: WindowId, kind: EventKind, root_id: Option<u64>) -> UiEvent {
    UiEvent {
        window_id,
        kind,
        timestamp: chrono::Utc::now(),
        root: root_id.map(|id| {
            Arc::new(UiNode {
                id,
                role: "frame".to_string(),
                text: None,
                bounds: NodeBounds::new(0, 0, 1080, 1920),
                children: vec![],
            })
        }),
        package: None,
    }
}

fn frame() -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::new(4, 4))
}

async fn wait_for_capture(source: &FakeSource, count: usize) {
    while source.captures() < count {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_scan_uses_latest_active_window_root() {
    let source = FakeSource::new();
    let mut manager = manager();
    let scanners: Vec<Arc<dyn Scanner>> = vec![Arc::new(RootEchoScanner)];
    let handle = manager.start(source.clone(), scanners).await.unwrap();

    handle.on_event(&event(5, EventKind::WindowStateChanged, Some(1)));
    handle.on_event(&event(7, EventKind::HoverEnter, Some(2)));

    let dispatch = tokio::spawn({
        let handle = handle.clone();
        async move { handle.dispatch(ScanRequest::default()).await }
    });
    wait_for_capture(&source, 1).await;
    source.complete_next(Ok(frame()));

    let result = dispatch.await.unwrap().unwrap();
    assert_eq!(result.metadata.window_id, 7);
    assert_eq!(
        result.outcomes[0].findings.as_ref().unwrap()[0].node_id,
        Some(2)
    );
}

#[tokio::test]
async fn test_overlapping_dispatch_is_rejected_immediately() {
    let source = FakeSource::new();
    let mut manager = manager();
    let handle = manager.start(source.clone(), vec![]).await.unwrap();
    handle.on_event(&event(1, EventKind::WindowStateChanged, Some(1)));

    let first = tokio::spawn({
        let handle = handle.clone();
        async move { handle.dispatch(ScanRequest::default()).await }
    });
    wait_for_capture(&source, 1).await;

    // Second call must fail Busy without waiting for the first to finish.
    let second = handle.dispatch(ScanRequest::default()).await;
    assert!(matches!(second, Err(DispatchError::Busy)));

    source.complete_next(Ok(frame()));
    assert!(first.await.unwrap().is_ok());

    // Once the first completed, the very next dispatch is admitted.
    let third = tokio::spawn({
        let handle = handle.clone();
        async move { handle.dispatch(ScanRequest::default()).await }
    });
    wait_for_capture(&source, 2).await;
    source.complete_next(Ok(frame()));
    assert!(third.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_failed_dispatch_releases_the_gate() {
    let source = FakeSource::new();
    let mut manager = manager();
    let handle = manager.start(source.clone(), vec![]).await.unwrap();
    handle.on_event(&event(1, EventKind::WindowStateChanged, Some(1)));

    let dispatch = tokio::spawn({
        let handle = handle.clone();
        async move { handle.dispatch(ScanRequest::default()).await }
    });
    wait_for_capture(&source, 1).await;
    source.complete_next(Err(CaptureFailure::NoActiveProjection));

    let result = dispatch.await.unwrap();
    assert!(matches!(
        result,
        Err(DispatchError::CaptureFailed(
            CaptureFailure::NoActiveProjection
        ))
    ));
    assert_eq!(handle.slot(), DispatcherSlot::Idle);
}

#[tokio::test]
async fn test_cancelled_dispatch_releases_the_gate() {
    let source = FakeSource::new();
    let mut manager = manager();
    let handle = manager.start(source.clone(), vec![]).await.unwrap();
    handle.on_event(&event(1, EventKind::WindowStateChanged, Some(1)));

    let dispatch = tokio::spawn({
        let handle = handle.clone();
        async move { handle.dispatch(ScanRequest::default()).await }
    });
    wait_for_capture(&source, 1).await;
    assert!(matches!(handle.slot(), DispatcherSlot::InFlight(_)));

    // Caller gives up while the screenshot is still outstanding; the gate
    // must return to idle regardless.
    dispatch.abort();
    assert!(dispatch.await.unwrap_err().is_cancelled());

    assert_eq!(handle.slot(), DispatcherSlot::Idle);
    let next = tokio::spawn({
        let handle = handle.clone();
        async move { handle.dispatch(ScanRequest::default()).await }
    });
    wait_for_capture(&source, 2).await;
    // The aborted dispatch's capture is still first in the queue; its late
    // completion is disregarded and only the second resolves the dispatch.
    source.complete_next(Ok(frame()));
    source.complete_next(Ok(frame()));
    assert!(next.await.unwrap().is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_capture_timeout_fails_dispatch_and_frees_gate() {
    let mut config = Config::default();
    config.capture.timeout_ms = 200;

    let source = FakeSource::new();
    let mut manager = manager_with(config);
    let handle = manager.start(source.clone(), vec![]).await.unwrap();
    handle.on_event(&event(1, EventKind::WindowStateChanged, Some(1)));

    // Platform never completes; the configured bound fires.
    let result = handle.dispatch(ScanRequest::default()).await;
    assert!(matches!(
        result,
        Err(DispatchError::CaptureFailed(CaptureFailure::Timeout))
    ));
    assert_eq!(handle.slot(), DispatcherSlot::Idle);
}

#[tokio::test]
async fn test_dispatch_before_any_event_reports_no_active_window() {
    let source = FakeSource::new();
    let mut manager = manager();
    let handle = manager.start(source.clone(), vec![]).await.unwrap();

    let result = handle.dispatch(ScanRequest::default()).await;
    assert!(matches!(result, Err(DispatchError::NoActiveWindow)));
    // No platform capture was triggered for a doomed dispatch.
    assert_eq!(source.captures(), 0);
}

#[tokio::test]
async fn test_restart_leaves_exactly_one_live_completion_channel() {
    let mut manager = manager();
    let old_source = FakeSource::new();
    let old_handle = manager.start(old_source.clone(), vec![]).await.unwrap();
    old_handle.on_event(&event(1, EventKind::WindowStateChanged, Some(1)));

    let old_dispatch = tokio::spawn({
        let old_handle = old_handle.clone();
        async move { old_handle.dispatch(ScanRequest::default()).await }
    });
    wait_for_capture(&old_source, 1).await;

    let new_source = FakeSource::new();
    let new_handle = manager.start(new_source.clone(), vec![]).await.unwrap();
    new_handle.on_event(&event(1, EventKind::WindowStateChanged, Some(1)));

    // Old generation's outstanding capture resolved Cancelled by teardown.
    assert!(matches!(
        old_dispatch.await.unwrap(),
        Err(DispatchError::CaptureFailed(CaptureFailure::Cancelled))
    ));

    // The old generation's late platform completion goes nowhere, and the
    // new generation still captures normally.
    old_source.complete_next(Ok(frame()));

    let new_dispatch = tokio::spawn({
        let new_handle = new_handle.clone();
        async move { new_handle.dispatch(ScanRequest::default()).await }
    });
    wait_for_capture(&new_source, 1).await;
    source_complete_and_assert(&new_source, new_dispatch).await;

    assert_eq!(old_source.captures(), 1);
    assert_eq!(new_source.captures(), 1);

    manager.stop().await;
}

async fn source_complete_and_assert(
    source: &FakeSource,
    dispatch: tokio::task::JoinHandle<Result<accessibility_scanner::ScanResult, DispatchError>>,
) {
    source.complete_next(Ok(frame()));
    assert!(dispatch.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_orientation_change_is_visible_in_next_snapshot() {
    let source = FakeSource::new();
    let mut manager = manager();
    let handle = manager.start(source.clone(), vec![]).await.unwrap();
    handle.on_event(&event(1, EventKind::WindowStateChanged, Some(1)));

    handle.device().set_orientation(Orientation::Landscape);

    let dispatch = tokio::spawn({
        let handle = handle.clone();
        async move { handle.dispatch(ScanRequest::default()).await }
    });
    wait_for_capture(&source, 1).await;
    source.complete_next(Ok(frame()));

    let result = dispatch.await.unwrap().unwrap();
    assert_eq!(result.metadata.orientation, Orientation::Landscape);
}
