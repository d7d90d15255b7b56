//! Active-window tracking from the platform's accessibility-event stream.
//!
//! The tracker maintains the identity of the currently active window and the
//! most recent UI root observed for it. It is written on the platform's
//! event-delivery context and read on the dispatch path, so the whole
//! {window id, root} pair is published as one atomically-swapped snapshot.

use crate::types::{DispatchError, UiEvent, UiNode, WindowId};
use arc_swap::ArcSwap;
use std::sync::Arc;
use tracing::{debug, trace};

/// The {active window, last recorded root} pair.
///
/// Exactly one live instance per pipeline generation; readers always observe
/// a consistent pair, never a window id with a superseded window's root.
#[derive(Debug, Clone, Default)]
pub struct ActiveWindowState {
    pub window_id: Option<WindowId>,
    pub root: Option<Arc<UiNode>>,
}

/// Both halves of a successful tracker read
#[derive(Debug, Clone)]
pub struct WindowSnapshot {
    pub window_id: WindowId,
    pub root: Arc<UiNode>,
}

/// Tracks the active window across the event stream.
///
/// `on_event` never blocks and is safe to call from the platform's delivery
/// context while dispatches read concurrently.
pub struct EventTracker {
    state: ArcSwap<ActiveWindowState>,
}

impl EventTracker {
    pub fn new() -> Self {
        Self {
            state: ArcSwap::from_pointee(ActiveWindowState::default()),
        }
    }

    /// Feed one platform event into the tracker.
    ///
    /// Window-state and hover events mark their window as active. Any event
    /// whose window matches the active window refreshes the recorded root,
    /// so content changes on the active window keep the tree current.
    /// Events from inactive windows update nothing.
    pub fn on_event(&self, event: &UiEvent) {
        self.state.rcu(|current| {
            let mut next = ActiveWindowState {
                window_id: current.window_id,
                root: current.root.clone(),
            };

            if event.kind.changes_active_window() && next.window_id != Some(event.window_id) {
                debug!(
                    "active window changed: {:?} -> {} ({})",
                    next.window_id,
                    event.window_id,
                    event.kind.as_str()
                );
                next.window_id = Some(event.window_id);
                // The previous window's root must not survive the switch.
                next.root = None;
            }

            if next.window_id == Some(event.window_id) {
                if let Some(root) = &event.root {
                    trace!(
                        "recorded root for window {} ({} nodes)",
                        event.window_id,
                        root.node_count()
                    );
                    next.root = Some(root.clone());
                }
            }

            Arc::new(next)
        });
    }

    /// Read both halves of the tracked state as one consistent pair.
    ///
    /// Fails with `NoActiveWindow` until an event has established an active
    /// window and recorded a root for it.
    pub fn snapshot(&self) -> Result<WindowSnapshot, DispatchError> {
        let state = self.state.load_full();
        match (state.window_id, &state.root) {
            (Some(window_id), Some(root)) => Ok(WindowSnapshot {
                window_id,
                root: root.clone(),
            }),
            _ => Err(DispatchError::NoActiveWindow),
        }
    }

    /// Current active window id, if one has been established
    pub fn active_window(&self) -> Option<WindowId> {
        self.state.load().window_id
    }

    /// Reset to the no-active-window state (generation teardown)
    pub fn clear(&self) {
        self.state.store(Arc::new(ActiveWindowState::default()));
    }
}

impl Default for EventTracker {
    fn default() -> Self {
        Self::new()
    }
}
