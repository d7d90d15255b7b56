//! Accessibility Scanner - On-device scan orchestration
//!
//! This crate provides the orchestration core of an on-device accessibility
//! scanning agent: it tracks the active window from the platform's
//! accessibility-event stream, bridges the asynchronous screenshot API into
//! awaitable captures, and dispatches scan requests against temporally
//! coherent snapshots under a single-flight policy.
//!
//! # Architecture
//!
//! Platform events feed the [`event_tracker`] continuously. A scan request
//! goes through the single-flight [`gate`] into the [`dispatcher`], which
//! combines the tracked UI root, a fresh screenshot from the [`screenshot`]
//! bridge, and the current [`device`] configuration into one snapshot, runs
//! the configured [`scanners`] against it, and serializes the outcome. The
//! [`lifecycle`] manager owns construction and teardown of the whole
//! pipeline across service connect/disconnect transitions.
//!
//! Rule engines, the platform tree walker, and the request transport are
//! external collaborators behind trait seams.

pub mod config;
pub mod device;
pub mod dispatcher;
pub mod event_tracker;
pub mod gate;
pub mod lifecycle;
pub mod policy;
pub mod scanners;
pub mod screenshot;
pub mod serializer;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use device::{DeviceConfig, DeviceConfigSource, DisplayMetrics, Orientation};
pub use dispatcher::{ScanRequestDispatcher, ScanSnapshot};
pub use event_tracker::{ActiveWindowState, EventTracker, WindowSnapshot};
pub use gate::{DispatcherSlot, ScanPermit, SingleFlightGate, SynchronizedDispatcher};
pub use lifecycle::{LifecycleError, PipelineHandle, PipelineLifecycleManager};
pub use policy::ScanTriggerPolicy;
pub use scanners::{Scanner, ScannerError};
pub use screenshot::{CaptureResult, CaptureSource, CompletionFn, ScreenshotBridge};
pub use serializer::ResultSerializer;
pub use types::{
    CaptureFailure, DispatchError, EventKind, Finding, Findings, NodeBounds, ResultFormat,
    RuleConfig, ScanRequest, ScanResult, ScannerOutcome, Severity, SnapshotMetadata, UiEvent,
    UiNode, WindowId,
};
