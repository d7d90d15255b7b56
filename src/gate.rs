//! Single-flight admission control for scan dispatches.
//!
//! At most one scan runs at a time. Overlapping admissions are rejected
//! immediately with `Busy` rather than queued: a queued scan against a
//! since-changed UI is worse than an explicit rejection the caller can
//! retry. The permit is an RAII guard, so the slot returns to idle on every
//! exit path of a dispatch, including caller cancellation mid-await.

use crate::dispatcher::ScanRequestDispatcher;
use crate::types::{DispatchError, ScanRequest, ScanResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tracing::{debug, warn};

/// Observable admission state of the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherSlot {
    Idle,
    InFlight(u64),
}

/// Admission permit for one dispatch.
///
/// Dropping it returns the gate to idle.
pub struct ScanPermit {
    request_id: u64,
    in_flight: Arc<AtomicU64>,
    _permit: OwnedSemaphorePermit,
}

impl ScanPermit {
    pub fn request_id(&self) -> u64 {
        self.request_id
    }
}

impl Drop for ScanPermit {
    fn drop(&mut self) {
        // Clear before the semaphore permit releases so a freshly admitted
        // request never observes the previous request id.
        self.in_flight.store(0, Ordering::SeqCst);
    }
}

/// Enforces at-most-one concurrent dispatch
pub struct SingleFlightGate {
    slot: Arc<Semaphore>,
    in_flight: Arc<AtomicU64>,
    next_request: AtomicU64,
}

impl SingleFlightGate {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Semaphore::new(1)),
            in_flight: Arc::new(AtomicU64::new(0)),
            next_request: AtomicU64::new(0),
        }
    }

    /// Try to admit a request. Never blocks, never queues.
    pub fn admit(&self, _request: &ScanRequest) -> Result<ScanPermit, DispatchError> {
        match self.slot.clone().try_acquire_owned() {
            Ok(permit) => {
                let request_id = self.next_request.fetch_add(1, Ordering::SeqCst) + 1;
                self.in_flight.store(request_id, Ordering::SeqCst);
                debug!("scan request {} admitted", request_id);
                Ok(ScanPermit {
                    request_id,
                    in_flight: self.in_flight.clone(),
                    _permit: permit,
                })
            }
            Err(TryAcquireError::NoPermits) => {
                // Expected under load; the caller retries later.
                debug!(
                    "scan rejected, request {} still in flight",
                    self.in_flight.load(Ordering::SeqCst)
                );
                Err(DispatchError::Busy)
            }
            Err(TryAcquireError::Closed) => {
                warn!("admission attempted against a closed gate");
                Err(DispatchError::Busy)
            }
        }
    }

    /// Current admission state
    pub fn slot(&self) -> DispatcherSlot {
        match self.in_flight.load(Ordering::SeqCst) {
            0 => DispatcherSlot::Idle,
            id => DispatcherSlot::InFlight(id),
        }
    }
}

impl Default for SingleFlightGate {
    fn default() -> Self {
        Self::new()
    }
}

/// A dispatcher behind the single-flight gate.
///
/// This is the handle handed to the request-handling layer: `dispatch`
/// admits, runs the inner dispatcher, and releases on every outcome.
pub struct SynchronizedDispatcher {
    gate: SingleFlightGate,
    inner: Arc<ScanRequestDispatcher>,
}

impl SynchronizedDispatcher {
    pub fn new(inner: Arc<ScanRequestDispatcher>) -> Self {
        Self {
            gate: SingleFlightGate::new(),
            inner,
        }
    }

    /// Admit and run one scan.
    ///
    /// Returns `Busy` immediately while another scan is in flight. The
    /// permit is held across the dispatch await and released on success,
    /// failure, or cancellation of this future.
    pub async fn dispatch(&self, request: ScanRequest) -> Result<ScanResult, DispatchError> {
        let permit = self.gate.admit(&request)?;
        let request_id = permit.request_id();

        let result = self.inner.dispatch(request).await;
        match &result {
            Ok(scan) => debug!(
                "scan request {} completed: {} scanner outcome(s), {} byte payload",
                request_id,
                scan.outcomes.len(),
                scan.payload.len()
            ),
            Err(e) => debug!("scan request {} failed: {}", request_id, e),
        }

        drop(permit);
        result
    }

    /// Current admission state
    pub fn slot(&self) -> DispatcherSlot {
        self.gate.slot()
    }
}
