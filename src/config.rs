use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Session settings. Every field has a default, so a config file only needs
/// the keys it changes:
///
/// ```json
/// { "extensions": ["mbsh5", "h5"], "y_index": 2 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// File extensions (without the dot, case-insensitive) a session accepts.
    pub extensions: Vec<String>,
    /// Column used for the x axis after a new selection.
    pub x_index: usize,
    /// Column used for the y axis.
    pub y_index: usize,
    /// Tree nodes with at most this many children start expanded.
    pub expand_threshold: usize,
    /// Column delimiter of table dumps.
    pub delimiter: char,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["mbsh5".into(), "ombvh5".into(), "h5".into()],
            x_index: 0,
            y_index: 1,
            expand_threshold: 3,
            delimiter: ' ',
        }
    }
}

impl SessionConfig {
    /// Read a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Whether `path` carries one of the accepted extensions.
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|a| a.eq_ignore_ascii_case(ext)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: SessionConfig = serde_json::from_str(r#"{ "y_index": 3 }"#).unwrap();
        assert_eq!(config.y_index, 3);
        assert_eq!(config.x_index, 0);
        assert_eq!(config.extensions, SessionConfig::default().extensions);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "extensions": ["h5"], "delimiter": "," }"#).unwrap();
        let config = SessionConfig::load(&path).unwrap();
        assert_eq!(config.extensions, vec!["h5"]);
        assert_eq!(config.delimiter, ',');
    }

    #[test]
    fn extension_filter() {
        let config = SessionConfig::default();
        assert!(config.accepts(Path::new("/tmp/run.mbsh5")));
        assert!(config.accepts(Path::new("RUN.H5")));
        assert!(!config.accepts(Path::new("run.csv")));
        assert!(!config.accepts(Path::new("run")));
    }
}
