//! Analysis subsystem configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Analysis execution configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Number of concurrent analysis workers
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
}

impl AnalysisConfig {
    /// Validate analysis configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.worker_count == 0 {
            return Err(ValidationError::InvalidWorkerCount);
        }
        Ok(())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
        }
    }
}

fn default_worker_count() -> usize {
    4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_config_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.worker_count, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_workers_is_invalid() {
        let config = AnalysisConfig { worker_count: 0 };
        assert!(config.validate().is_err());
    }
}
