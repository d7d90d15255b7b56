//! Device/display configuration.
//!
//! Correct display metrics are only observable while the host service is
//! live, not when the pipeline is constructed, so the dispatcher asks a
//! metrics callback at snapshot-assembly time. Orientation updates arrive
//! from the host's configuration-changed hook.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::debug;

/// Device orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    fn as_u8(self) -> u8 {
        match self {
            Orientation::Portrait => 0,
            Orientation::Landscape => 1,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Orientation::Landscape,
            _ => Orientation::Portrait,
        }
    }
}

/// Raw display metrics as reported by the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayMetrics {
    pub width: u32,
    pub height: u32,
    pub density: f32,
}

/// Device configuration captured into one scan snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub screen_width: u32,
    pub screen_height: u32,
    pub density: f32,
    pub orientation: Orientation,
}

/// Produces the device configuration current at snapshot time
pub struct DeviceConfigSource {
    metrics: Box<dyn Fn() -> DisplayMetrics + Send + Sync>,
    orientation: AtomicU8,
}

impl DeviceConfigSource {
    pub fn new(
        metrics: impl Fn() -> DisplayMetrics + Send + Sync + 'static,
        initial_orientation: Orientation,
    ) -> Self {
        Self {
            metrics: Box::new(metrics),
            orientation: AtomicU8::new(initial_orientation.as_u8()),
        }
    }

    /// Record an orientation change from the host
    pub fn set_orientation(&self, orientation: Orientation) {
        let prev = Orientation::from_u8(
            self.orientation
                .swap(orientation.as_u8(), Ordering::SeqCst),
        );
        if prev != orientation {
            debug!("orientation changed: {:?} -> {:?}", prev, orientation);
        }
    }

    pub fn orientation(&self) -> Orientation {
        Orientation::from_u8(self.orientation.load(Ordering::SeqCst))
    }

    /// Device configuration as of right now
    pub fn current(&self) -> DeviceConfig {
        let metrics = (self.metrics)();
        DeviceConfig {
            screen_width: metrics.width,
            screen_height: metrics.height,
            density: metrics.density,
            orientation: self.orientation(),
        }
    }
}
