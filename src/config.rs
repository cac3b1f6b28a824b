use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::GridError;

/// Rows at or above this count are filtered and sorted on the rayon pool.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 10_000;

/// Widths (in pixels) used for the synthetic columns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyntheticSizes {
    pub selection: u32,
    pub row_number: u32,
    pub actions: u32,
}

impl Default for SyntheticSizes {
    fn default() -> Self {
        Self {
            selection: 40,
            row_number: 56,
            actions: 64,
        }
    }
}

/// Parameters for the default auto-fit measurer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MeasureConfig {
    /// Pixels per terminal display cell of text.
    pub px_per_cell: u32,
    /// Extra pixels added around the widest value.
    pub padding: u32,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            px_per_cell: 8,
            padding: 24,
        }
    }
}

/// Grid-wide options. Every field has a default, so an empty TOML file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GridConfig {
    pub enable_selection: bool,
    pub show_row_numbers: bool,
    pub row_actions: bool,
    pub synthetic: SyntheticSizes,
    pub default_min_size: u32,
    pub default_max_size: u32,
    pub parallel_threshold: usize,
    pub measure: MeasureConfig,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            enable_selection: true,
            show_row_numbers: true,
            row_actions: false,
            synthetic: SyntheticSizes::default(),
            default_min_size: 60,
            default_max_size: 800,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            measure: MeasureConfig::default(),
        }
    }
}

impl GridConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, GridError> {
        Ok(toml::from_str(content)?)
    }

    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self, GridError> {
        let content = std::fs::read_to_string(path).map_err(|source| GridError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let cfg = GridConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, GridConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let cfg = GridConfig::from_toml_str(
            r#"
            row_actions = true
            parallel_threshold = 5

            [synthetic]
            actions = 90
            "#,
        )
        .unwrap();
        assert!(cfg.row_actions);
        assert!(cfg.enable_selection);
        assert_eq!(cfg.parallel_threshold, 5);
        assert_eq!(cfg.synthetic.actions, 90);
        assert_eq!(cfg.synthetic.selection, 40);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = GridConfig::from_toml_str("enable_selection = \"yes\"").unwrap_err();
        assert!(matches!(err, GridError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "show_row_numbers = false").unwrap();
        let cfg = GridConfig::load(file.path()).unwrap();
        assert!(!cfg.show_row_numbers);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = GridConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, GridError::Io { .. }));
    }
}
