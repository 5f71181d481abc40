//! Layout files
//!
//! ```toml
//! name = "dev"
//!
//! [layout]
//! split = "vertical"
//! first = { pane = "Server", command = "echo 'Starting Server...'" }
//!
//! [layout.second]
//! split = "horizontal"
//! first = { pane = "Worker", command = "echo 'Starting Worker...'" }
//! second = { pane = "Logs", command = "echo 'Tailing logs...'" }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::PaneLayout;
use crate::error::{Error, Result};

/// A named layout stored on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutFile {
    #[serde(default)]
    pub name: Option<String>,
    pub layout: PaneLayout,
}

impl LayoutFile {
    /// Load a layout from TOML, or JSON when the extension says so
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::ConfigLoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let file: LayoutFile = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content).map_err(|e| Error::ConfigParseFailed {
                format: "JSON".to_string(),
                reason: e.to_string(),
            })?,
            _ => Self::from_toml(&content)?,
        };

        file.layout.validate()?;
        Ok(file)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigParseFailed {
            format: "TOML".to_string(),
            reason: e.to_string(),
        })
    }
}
