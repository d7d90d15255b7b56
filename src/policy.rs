//! Scan trigger policy.
//!
//! Deciding *when* an accessibility event should lead to a scan is a
//! product decision, not part of the orchestration core: the dispatcher
//! only ever sees requests someone chose to issue. This policy is the
//! configurable version of that choice, matched on the event's package
//! identifier, and is consumed by the layer that feeds `dispatch`.

use crate::config::TriggerConfig;
use crate::types::UiEvent;
use tracing::warn;

/// Package-pattern policy for turning events into scan requests
pub struct ScanTriggerPolicy {
    trigger_patterns: Vec<glob::Pattern>,
    ignore_patterns: Vec<glob::Pattern>,
}

impl ScanTriggerPolicy {
    pub fn new(config: &TriggerConfig) -> Self {
        Self {
            trigger_patterns: compile_patterns(&config.trigger_packages),
            ignore_patterns: compile_patterns(&config.ignore_packages),
        }
    }

    /// Whether this event should trigger a scan.
    ///
    /// Events without a package never trigger. Ignored packages never
    /// trigger. With an empty trigger list, any non-ignored package
    /// triggers; otherwise the package must match a trigger pattern.
    pub fn should_trigger(&self, event: &UiEvent) -> bool {
        let package = match &event.package {
            Some(package) => package,
            None => return false,
        };

        if self.ignore_patterns.iter().any(|p| p.matches(package)) {
            return false;
        }

        if self.trigger_patterns.is_empty() {
            return true;
        }

        self.trigger_patterns.iter().any(|p| p.matches(package))
    }
}

fn compile_patterns(patterns: &[String]) -> Vec<glob::Pattern> {
    patterns
        .iter()
        .filter_map(|pattern| {
            glob::Pattern::new(pattern)
                .map_err(|e| {
                    warn!("Invalid package pattern '{}': {}", pattern, e);
                    e
                })
                .ok()
        })
        .collect()
}
