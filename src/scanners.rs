//! Scanner capability seam.
//!
//! The concrete rule engines (axe-style, ATFA-style) live outside this
//! crate; the dispatcher treats them polymorphically over the `Scanner`
//! trait. Configured scanners can be disabled by id via `ScannersConfig`.

use crate::config::ScannersConfig;
use crate::dispatcher::ScanSnapshot;
use crate::types::Findings;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Errors a scanner can surface to the dispatcher
#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    #[error("snapshot not scannable: {0}")]
    Unsupported(String),

    #[error("rule evaluation failed: {0}")]
    RuleFailed(String),
}

/// Capability every external scanner must expose
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Stable scanner identifier (e.g. "axe", "atfa")
    fn id(&self) -> &str;

    /// Run this scanner's rules against one snapshot
    async fn scan(&self, snapshot: &ScanSnapshot) -> Result<Findings, ScannerError>;
}

/// Apply the config's disable list to the registered scanners
pub fn enabled_scanners(
    scanners: Vec<Arc<dyn Scanner>>,
    config: &ScannersConfig,
) -> Vec<Arc<dyn Scanner>> {
    let (enabled, disabled): (Vec<_>, Vec<_>) = scanners
        .into_iter()
        .partition(|s| !config.disabled.iter().any(|id| id == s.id()));

    for scanner in &disabled {
        info!("scanner '{}' disabled by configuration", scanner.id());
    }

    enabled
}
