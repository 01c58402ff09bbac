use crate::transpose::TileShape;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

// --- Public Data Structures ---
// These structs define the TOML tuning file read by the pipeline. Every field has a
// default, so an empty file is a valid configuration.

/// Tuning for the tiled transpose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransposeConfig {
    /// Tile height along the input's row axis.
    pub tile_rows: usize,
    /// Tile width along the input's column axis.
    pub tile_cols: usize,
    /// Worker threads for the transpose pool. Absent means one per logical CPU.
    pub workers: Option<usize>,
}

impl Default for TransposeConfig {
    fn default() -> Self {
        Self {
            tile_rows: TileShape::DEFAULT.rows,
            tile_cols: TileShape::DEFAULT.cols,
            workers: None,
        }
    }
}

impl TransposeConfig {
    pub fn tile_shape(&self) -> TileShape {
        TileShape {
            rows: self.tile_rows,
            cols: self.tile_cols,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get).max(1)
    }
}

/// Tuning for the sliding median baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MedianConfig {
    /// Window width in samples.
    pub window: usize,
}

impl Default for MedianConfig {
    fn default() -> Self {
        Self { window: 5 }
    }
}

/// The complete kernel configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KernelConfig {
    pub transpose: TransposeConfig,
    pub median: MedianConfig,
}

/// Custom error type for loading and validating a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML configuration: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize configuration to TOML: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },
}

impl KernelConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        log::debug!("Loaded kernel configuration from {}", path.display());
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transpose.tile_rows == 0 {
            return Err(ConfigError::InvalidValue {
                field: "transpose.tile_rows",
                reason: "must be at least 1",
            });
        }
        if self.transpose.tile_cols == 0 {
            return Err(ConfigError::InvalidValue {
                field: "transpose.tile_cols",
                reason: "must be at least 1",
            });
        }
        if self.transpose.workers == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "transpose.workers",
                reason: "must be at least 1 when given",
            });
        }
        if self.median.window == 0 {
            return Err(ConfigError::InvalidValue {
                field: "median.window",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = KernelConfig::from_toml_str("").unwrap();
        assert_eq!(config, KernelConfig::default());
        assert_eq!(config.transpose.tile_shape(), TileShape::DEFAULT);
        assert!(config.transpose.worker_count() >= 1);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = KernelConfig::from_toml_str(
            "[transpose]\ntile_rows = 32\nworkers = 2\n\n[median]\nwindow = 101\n",
        )
        .unwrap();
        assert_eq!(config.transpose.tile_shape(), TileShape { rows: 32, cols: 16 });
        assert_eq!(config.transpose.worker_count(), 2);
        assert_eq!(config.median.window, 101);
    }

    #[test]
    fn zero_values_are_rejected() {
        for text in [
            "[transpose]\ntile_cols = 0\n",
            "[transpose]\nworkers = 0\n",
            "[median]\nwindow = 0\n",
        ] {
            assert!(matches!(
                KernelConfig::from_toml_str(text),
                Err(ConfigError::InvalidValue { .. })
            ));
        }
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            KernelConfig::from_toml_str("[median]\nwidth = 3\n"),
            Err(ConfigError::TomlParseError(_))
        ));
    }

    #[test]
    fn serialization_round_trips() {
        let mut config = KernelConfig::default();
        config.transpose.workers = Some(4);
        let text = config.to_toml_string().unwrap();
        assert_eq!(KernelConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kernels.toml");
        fs::write(&path, "[median]\nwindow = 9\n").unwrap();
        assert_eq!(KernelConfig::load(&path).unwrap().median.window, 9);
    }
}
