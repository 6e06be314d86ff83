// SPDX-License-Identifier: GPL-3.0-only

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backends::SourceKind;
use crate::constants::{DisplayMode, app};
use crate::depth::{
    CalibrationCurve, CalibrationTable, DEFAULT_TILT_DEGREES, StatisticsParams, TILT_MAX_DEGREES,
    TILT_MIN_DEGREES,
};
use crate::errors::{AppError, AppResult};

/// Persistent settings, stored as JSON
///
/// Every field has a default, so a partial file (or none at all) is valid.
/// Command-line flags override whatever is loaded here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output mode
    pub mode: DisplayMode,
    /// Code domain, sentinel and degradation threshold
    pub statistics: StatisticsParams,
    /// Raw code to distance curve
    pub calibration: CalibrationCurve,
    /// Driver stack for live capture
    pub source: SourceKind,
    /// Device node or freedepth index
    pub device: Option<String>,
    /// Tilt applied when capture starts (None leaves the motor alone)
    pub tilt: Option<i8>,
    /// Sysfs LED directory for the degradation indicator
    pub led: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: DisplayMode::default(),
            statistics: StatisticsParams::default(),
            calibration: CalibrationCurve::default(),
            source: SourceKind::default(),
            device: None,
            tilt: Some(DEFAULT_TILT_DEGREES),
            led: None,
        }
    }
}

impl Config {
    /// `<config dir>/depthstats/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(app::CONFIG_DIR_NAME).join(app::CONFIG_FILE_NAME))
    }

    /// Load from a file; a missing file yields the defaults
    pub fn load(path: &Path) -> AppResult<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(AppError::Config(format!("{}: {}", path.display(), e)));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;

        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Load from `path`, or from the default location when unset
    pub fn load_or_default(path: Option<&Path>) -> AppResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::default_path() {
                Some(path) => Self::load(&path),
                None => Ok(Self::default()),
            },
        }
    }

    /// Write as pretty-printed JSON, creating the parent directory
    pub fn save(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        debug!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Check values that would make the engine or the calibration table unusable
    pub fn validate(&self) -> AppResult<()> {
        self.statistics.validate().map_err(AppError::Config)?;
        self.calibration.validate().map_err(AppError::Config)?;

        if let Some(tilt) = self.tilt {
            if !(TILT_MIN_DEGREES..=TILT_MAX_DEGREES).contains(&tilt) {
                return Err(AppError::Config(format!(
                    "tilt must be within {}..={} degrees, got {}",
                    TILT_MIN_DEGREES, TILT_MAX_DEGREES, tilt
                )));
            }
        }
        Ok(())
    }

    /// Build the calibration table for the configured curve and domain
    pub fn calibration_table(&self) -> CalibrationTable {
        CalibrationTable::build(self.calibration, self.statistics.domain_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "mode": "median-scaled", "statistics": { "degradation_threshold_percent": 50 } }"#)
                .unwrap();
        assert_eq!(config.mode, DisplayMode::MedianScaled);
        assert_eq!(config.statistics.degradation_threshold_percent, 50);
        assert_eq!(config.statistics.sentinel_code, 2047);
        assert_eq!(config.tilt, Some(-5));
    }

    #[test]
    fn test_validate_rejects_bad_tilt() {
        let config = Config {
            tilt: Some(40),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }
}
