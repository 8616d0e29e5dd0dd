//! Built-in analysis modules.

pub mod latency_tokens;
pub mod units;

use std::sync::Arc;

use super::errors::AnalysisError;
use super::registry::ModuleRegistry;

pub use latency_tokens::{ChartConfig, ChartMeta, LatencyTokensModule, UnitLink};
pub use units::{group_by_unit, UnitGroup, UnitKey};

/// Installs the platform's built-in modules.
///
/// Uses `replace` so repeated initialization (tests, hot reload) is
/// idempotent.
pub fn register_builtin_modules(registry: &ModuleRegistry) -> Result<(), AnalysisError> {
    registry.replace(
        latency_tokens::definition()?,
        Arc::new(LatencyTokensModule),
    );
    Ok(())
}
