//! Core types used throughout the scanning agent.
//!
//! This module defines the fundamental data structures for UI events,
//! accessibility trees, scan requests/results, and the error taxonomy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Unique identifier for a window (platform-specific)
pub type WindowId = i64;

/// Kind of UI event delivered by the host platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A window came to the foreground or changed state
    WindowStateChanged,
    /// Pointer/explore-by-touch hover entered a view
    HoverEnter,
    /// Pointer/explore-by-touch hover left a view
    HoverExit,
    /// Any other event type (content changes, scrolls, clicks, ...)
    Other,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::WindowStateChanged => "window-state-changed",
            EventKind::HoverEnter => "hover-enter",
            EventKind::HoverExit => "hover-exit",
            EventKind::Other => "other",
        }
    }

    /// Whether this event kind marks its window as the active window.
    ///
    /// Matches the platform guidance for retrieving window content: only
    /// window-state and hover transitions establish which window is active.
    pub fn changes_active_window(&self) -> bool {
        matches!(
            self,
            EventKind::WindowStateChanged | EventKind::HoverEnter | EventKind::HoverExit
        )
    }
}

/// One UI event from the platform's accessibility-event stream.
///
/// Produced continuously by the host, consumed only by the event tracker,
/// never persisted.
#[derive(Debug, Clone)]
pub struct UiEvent {
    /// Window the event originated from
    pub window_id: WindowId,
    /// Event kind
    pub kind: EventKind,
    /// Delivery timestamp
    pub timestamp: DateTime<Utc>,
    /// Root of the active window's accessibility tree at delivery time,
    /// if the platform could resolve one
    pub root: Option<Arc<UiNode>>,
    /// Package/bundle identifier of the app that produced the event
    pub package: Option<String>,
}

/// Position and size of a node on screen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeBounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl NodeBounds {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

/// Abstract accessibility node.
///
/// The interchange format handed to scanners. The platform walker that
/// converts a live UI tree into this shape is out of scope for this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiNode {
    /// Node identifier, unique within one tree
    pub id: u64,
    /// Platform role/class (e.g. "button", "image")
    pub role: String,
    /// Visible or accessible text, if any
    pub text: Option<String>,
    /// On-screen bounds
    pub bounds: NodeBounds,
    /// Child nodes
    pub children: Vec<UiNode>,
}

impl UiNode {
    /// Total number of nodes in this subtree, including self
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(UiNode::node_count).sum::<usize>()
    }
}

/// Which scanners a request wants to run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Scanner ids to run; `None` runs every configured scanner
    #[serde(default)]
    pub scanner_ids: Option<Vec<String>>,
}

impl RuleConfig {
    /// Whether a scanner with the given id should run under this config
    pub fn includes(&self, scanner_id: &str) -> bool {
        match &self.scanner_ids {
            Some(ids) => ids.iter().any(|id| id == scanner_id),
            None => true,
        }
    }
}

/// Output encoding of the serialized result payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultFormat {
    #[default]
    Json,
    JsonPretty,
}

/// A scan request from the external request-handling layer
#[derive(Debug, Clone, Default)]
pub struct ScanRequest {
    /// Requested rule configuration
    pub rules: RuleConfig,
    /// Result payload format
    pub format: ResultFormat,
}

/// One finding reported by a scanner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Rule identifier within the scanner
    pub rule: String,
    /// Severity of the finding
    pub severity: Severity,
    /// Human-readable description
    pub message: String,
    /// Node the finding applies to, if node-scoped
    pub node_id: Option<u64>,
}

/// Severity of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Findings from one scanner run
pub type Findings = Vec<Finding>;

/// Result of one scanner against one snapshot.
///
/// A failed scanner is recorded here rather than aborting the dispatch, so
/// partial results can still be returned alongside the failure record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerOutcome {
    /// Scanner identifier
    pub scanner: String,
    /// Findings, present when the scanner succeeded
    pub findings: Option<Findings>,
    /// Failure description, present when the scanner failed
    pub error: Option<String>,
}

impl ScannerOutcome {
    pub fn ok(scanner: impl Into<String>, findings: Findings) -> Self {
        Self {
            scanner: scanner.into(),
            findings: Some(findings),
            error: None,
        }
    }

    pub fn failed(scanner: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            scanner: scanner.into(),
            findings: None,
            error: Some(error.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Device context recorded next to scanner findings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// Window the snapshot was taken from
    pub window_id: WindowId,
    /// Screen dimensions at snapshot time
    pub screen_width: u32,
    pub screen_height: u32,
    /// Device orientation at snapshot time
    pub orientation: crate::device::Orientation,
    /// Snapshot timestamp (unix millis)
    pub timestamp: i64,
}

/// Completed scan: per-scanner outcomes plus the serialized container.
///
/// Ownership transfers to the caller once returned.
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub outcomes: Vec<ScannerOutcome>,
    pub metadata: SnapshotMetadata,
    /// Serialized result container, ready to hand to the transport layer
    pub payload: Vec<u8>,
}

/// How a screenshot capture attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CaptureFailure {
    #[error("no active screen-capture projection")]
    NoActiveProjection,

    #[error("no capture completion arrived within the configured bound")]
    Timeout,

    #[error("capture was cancelled")]
    Cancelled,
}

/// How a dispatch failed.
///
/// None of these are fatal to the pipeline; a failed dispatch leaves the
/// gate, tracker, and bridge ready for the next request.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no active window has been observed yet")]
    NoActiveWindow,

    #[error("a scan is already in flight")]
    Busy,

    #[error("screenshot capture failed: {0}")]
    CaptureFailed(#[from] CaptureFailure),

    #[error("scanner '{id}' failed: {reason}")]
    ScannerFailed { id: String, reason: String },

    #[error("failed to serialize scan result: {0}")]
    Serialize(#[from] serde_json::Error),
}
