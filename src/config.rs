//! User configuration
//!
//! Read from `config.toml` in the platform config directory
//! (`~/.config/sardine-tools/config.toml` on Linux):
//!
//! ```toml
//! threads = 4
//!
//! [samples]
//! dirs = ["~/Dirt-Samples"]
//! families = ["bd", "sn"]
//!
//! [display]
//! depth = 2
//! ```

use crate::error::{ToolsError, ToolsResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const CONFIG_DIR: &str = "sardine-tools";
const CONFIG_FILE: &str = "config.toml";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Worker threads for sample scanning
    pub threads: Option<usize>,
    pub samples: SamplesConfig,
    pub display: DisplayConfig,
}

/// Where sample libraries live
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplesConfig {
    /// Empty means the SuperDirt default location
    pub dirs: Vec<PathBuf>,
    /// Families to scan; all sub-directories when unset
    pub families: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Tree depth used when none is given on the command line
    pub depth: Option<usize>,
}

impl ToolsConfig {
    /// `<config dir>/sardine-tools/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub fn load(path: &Path) -> ToolsResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse TOML, falling back to JSON
    pub fn parse(content: &str) -> ToolsResult<Self> {
        let toml_err = match toml::from_str(content) {
            Ok(config) => return Ok(config),
            Err(e) => e,
        };

        if let Ok(config) = serde_json::from_str(content) {
            return Ok(config);
        }

        Err(ToolsError::Config(toml_err.to_string()))
    }

    /// Load an explicit config file, or the default one when it exists.
    ///
    /// A missing default file is not an error; a missing explicit file is.
    pub fn resolve(explicit: Option<&Path>) -> ToolsResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => {
                debug!("Loading config from {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Sample directories with a leading `~` expanded
    pub fn sample_dirs(&self) -> Vec<PathBuf> {
        self.samples.dirs.iter().map(|dir| expand_home(dir)).collect()
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
