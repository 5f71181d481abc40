//! Configuration File Loading
//!
//! Finds `config.toml` or `config.json` in the usual places and falls back to
//! defaults when none exists. An explicit path (`--config` or
//! `TERMPILOT_CONFIG`) must exist and parse.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::DriverConfig;
use crate::error::{Error, Result};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV: &str = "TERMPILOT_CONFIG";

/// Configuration file loader
pub struct ConfigLoader {
    /// Directories searched for a configuration file, in priority order
    search_paths: Vec<PathBuf>,
    /// Supported configuration file formats
    supported_formats: Vec<ConfigFormat>,
    /// Path of the file the last load read (if any)
    current_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }

    fn name(self) -> &'static str {
        match self {
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Json => "JSON",
        }
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            search_paths: Self::get_search_paths(),
            supported_formats: vec![ConfigFormat::Toml, ConfigFormat::Json],
            current_path: None,
        }
    }

    /// Load configuration from `explicit`, `TERMPILOT_CONFIG`, the search
    /// paths, or defaults, in that order
    pub fn load(&mut self, explicit: Option<&Path>) -> Result<DriverConfig> {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from));

        if let Some(path) = explicit {
            return self.load_from_path(&path);
        }

        match self.find_and_load_config()? {
            Some((path, config)) => {
                debug!("Loaded configuration from {}", path.display());
                self.current_path = Some(path);
                Ok(config)
            }
            None => {
                debug!("No configuration file found, using defaults");
                let config = DriverConfig::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Load and validate one specific file
    pub fn load_from_path(&mut self, path: &Path) -> Result<DriverConfig> {
        let config = self.load_config_file(path, ConfigFormat::from_path(path))?;
        config.validate()?;
        self.current_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// First readable file in the search paths
    ///
    /// A file that exists but does not parse or validate is skipped with a
    /// warning.
    fn find_and_load_config(&self) -> Result<Option<(PathBuf, DriverConfig)>> {
        for dir in &self.search_paths {
            for format in &self.supported_formats {
                let config_path = self.get_config_path_for_format(dir, *format);
                if !config_path.exists() {
                    continue;
                }

                match self
                    .load_config_file(&config_path, *format)
                    .and_then(|config| config.validate().map(|_| config).map_err(Error::from))
                {
                    Ok(config) => return Ok(Some((config_path, config))),
                    Err(e) => {
                        warn!(
                            "Failed to load config from {}: {}",
                            config_path.display(),
                            e
                        );
                    }
                }
            }
        }

        Ok(None)
    }

    fn load_config_file(&self, path: &Path, format: ConfigFormat) -> Result<DriverConfig> {
        let content = fs::read_to_string(path).map_err(|e| Error::ConfigLoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let parsed = match format {
            ConfigFormat::Toml => toml::from_str(&content).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::from_str(&content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|reason| Error::ConfigParseFailed {
            format: format.name().to_string(),
            reason,
        })
    }

    fn get_config_path_for_format(&self, dir: &Path, format: ConfigFormat) -> PathBuf {
        dir.join("config").with_extension(format.extension())
    }

    fn get_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
            if !xdg_config.is_empty() {
                paths.push(PathBuf::from(xdg_config).join("termpilot"));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let dir = config_dir.join("termpilot");
            if !paths.contains(&dir) {
                paths.push(dir);
            }
        }

        if let Some(home) = dirs::home_dir() {
            let dir = home.join(".config").join("termpilot");
            if !paths.contains(&dir) {
                paths.push(dir);
            }
            paths.push(home.join(".termpilot"));
        }

        if let Ok(cwd) = env::current_dir() {
            paths.push(cwd.join(".termpilot"));
        }

        paths
    }

    /// Path of the file the last load read
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    pub fn add_search_path(&mut self, path: PathBuf) {
        self.search_paths.push(path);
    }

    /// Clear all search paths and add a single path
    pub fn set_search_path(&mut self, path: PathBuf) {
        self.search_paths = vec![path];
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
