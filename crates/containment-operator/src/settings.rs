//! Operator settings
//!
//! Loaded from a TOML file with `[reconciler]` and `[controller]` tables.
//! Every field has a default, so an empty file is valid.

use containment_core::config::ReconcilerConfig;
use containment_core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// Settings file
        path: PathBuf,
        /// Cause
        source: std::io::Error,
    },

    /// File is not valid TOML for the settings schema
    #[error("invalid settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// Reconciler table failed validation
    #[error(transparent)]
    Reconciler(#[from] ConfigError),

    /// Controller table failed validation
    #[error("invalid controller settings: {0}")]
    Controller(&'static str),
}

/// Worker pool, watcher and queue tunables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    /// Concurrent reconcile workers
    pub workers: usize,
    /// Upper bound on one reconcile
    pub reconcile_timeout_secs: u64,
    /// Interval between intent directory scans
    pub poll_interval_secs: u64,
    /// First error backoff
    pub backoff_base_ms: u64,
    /// Error backoff ceiling
    pub backoff_max_secs: u64,
}

impl ControllerSettings {
    /// Per-reconcile deadline
    #[inline]
    #[must_use]
    pub fn reconcile_timeout(&self) -> Duration {
        Duration::from_secs(self.reconcile_timeout_secs)
    }

    /// Watcher poll interval
    #[inline]
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// First error backoff
    #[inline]
    #[must_use]
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    /// Error backoff ceiling
    #[inline]
    #[must_use]
    pub fn backoff_max(&self) -> Duration {
        Duration::from_secs(self.backoff_max_secs)
    }

    /// Validate ranges
    ///
    /// # Errors
    /// - `SettingsError::Controller` naming the first invalid field
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.workers == 0 {
            return Err(SettingsError::Controller("workers must be at least 1"));
        }
        if self.reconcile_timeout_secs == 0 {
            return Err(SettingsError::Controller(
                "reconcile_timeout_secs must be greater than zero",
            ));
        }
        if self.poll_interval_secs == 0 {
            return Err(SettingsError::Controller("poll_interval_secs must be greater than zero"));
        }
        if self.backoff_base_ms == 0 {
            return Err(SettingsError::Controller("backoff_base_ms must be greater than zero"));
        }
        if self.backoff_base() > self.backoff_max() {
            return Err(SettingsError::Controller("backoff_base_ms exceeds backoff_max_secs"));
        }
        Ok(())
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            reconcile_timeout_secs: 30,
            poll_interval_secs: 2,
            backoff_base_ms: 1_000,
            backoff_max_secs: 300,
        }
    }
}

/// Complete operator settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorSettings {
    /// Gating and retry
    pub reconciler: ReconcilerConfig,
    /// Worker pool
    pub controller: ControllerSettings,
}

impl OperatorSettings {
    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// - `SettingsError::Parse` for malformed documents
    /// - `SettingsError::Reconciler`/`Controller` for out-of-range values
    pub fn from_toml_str(raw: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from `path`, or defaults when `None`
    ///
    /// # Errors
    /// - `SettingsError::Io` if the file cannot be read
    /// - Any error of [`OperatorSettings::from_toml_str`]
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// With worker count
    #[inline]
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.controller.workers = workers;
        self
    }

    /// Validate both tables
    ///
    /// # Errors
    /// - The first validation error found
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.reconciler.validate()?;
        self.controller.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(OperatorSettings::from_toml_str("").unwrap(), OperatorSettings::default());
    }

    #[test]
    fn tables_override_defaults() {
        let settings = OperatorSettings::from_toml_str(
            r#"
            [reconciler]
            confidence_threshold = 0.8
            low_confidence_recheck_secs = 600
            default_namespace = "prod"

            [controller]
            workers = 8
            backoff_max_secs = 60
            "#,
        )
        .unwrap();

        assert!((settings.reconciler.confidence_threshold - 0.8).abs() < f64::EPSILON);
        assert_eq!(settings.reconciler.low_confidence_recheck(), Some(Duration::from_secs(600)));
        assert_eq!(settings.reconciler.default_namespace, "prod");
        assert_eq!(settings.reconciler.approval_requeue_secs, 30);
        assert_eq!(settings.controller.workers, 8);
        assert_eq!(settings.controller.backoff_max(), Duration::from_secs(60));
        assert_eq!(settings.controller.reconcile_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            OperatorSettings::from_toml_str("[controller]\nworkers = 0"),
            Err(SettingsError::Controller(_))
        ));
        assert!(matches!(
            OperatorSettings::from_toml_str("[reconciler]\nconfidence_threshold = 2.0"),
            Err(SettingsError::Reconciler(ConfigError::InvalidThreshold(_)))
        ));
        assert!(matches!(
            OperatorSettings::from_toml_str("[controller]\nworkers = \"many\""),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err =
            OperatorSettings::load(Some(Path::new("/nonexistent/operator.toml"))).unwrap_err();
        assert!(matches!(err, SettingsError::Io { .. }));
    }
}
