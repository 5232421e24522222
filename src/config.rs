use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::boundary::BoundaryConfig;
use crate::engine::LayoutConfig;
use crate::error::{GenogramError, Result};
use crate::history::HistoryConfig;

pub const CONFIG_FILE_NAME: &str = "genodraw.json";

const ENV_HISTORY_DEPTH: &str = "GENODRAW_HISTORY_DEPTH";
const ENV_GRID_SIZE: &str = "GENODRAW_GRID_SIZE";
const ENV_BOUNDARY_PADDING: &str = "GENODRAW_BOUNDARY_PADDING";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    pub layout: LayoutConfig,
    pub boundary: BoundaryConfig,
    pub history: HistoryConfig,
}

impl EditorConfig {
    /// Reads `path` when given, otherwise `genodraw.json` from the user config
    /// directory when present, then applies `GENODRAW_*` overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path().filter(|candidate| candidate.is_file()) {
                Some(candidate) => Self::from_file(&candidate)?,
                None => Self::default(),
            },
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| GenogramError::io(path, err))?;
        let config = Self::from_json(&raw)?;
        debug!(path = %path.display(), "loaded editor config");
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let mut config: EditorConfig = serde_json::from_str(raw)?;
        // 0 means unbounded, same as the env override.
        config.history.max_depth = config.history.max_depth.filter(|depth| *depth > 0);
        config.validate()?;
        Ok(config)
    }

    /// Unparseable values are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(depth) = parse_var::<usize>(&lookup, ENV_HISTORY_DEPTH) {
            self.history.max_depth = (depth > 0).then_some(depth);
        }
        if let Some(grid) = parse_var::<f32>(&lookup, ENV_GRID_SIZE) {
            self.layout.grid_size = grid;
        }
        if let Some(padding) = parse_var::<f32>(&lookup, ENV_BOUNDARY_PADDING) {
            self.boundary.padding = padding;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let layout = &self.layout;
        let sizes = [
            ("layout.nodeWidth", layout.node_width),
            ("layout.nodeHeight", layout.node_height),
            ("layout.generationHeight", layout.generation_height),
        ];
        for (name, value) in sizes {
            if !value.is_finite() || value <= 0.0 {
                return Err(GenogramError::InvalidConfig(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        if !layout.grid_size.is_finite() || layout.grid_size < 0.0 {
            return Err(GenogramError::InvalidConfig(format!(
                "layout.gridSize must be zero or positive, got {}",
                layout.grid_size
            )));
        }
        if !self.boundary.padding.is_finite() || self.boundary.padding < 0.0 {
            return Err(GenogramError::InvalidConfig(format!(
                "boundary.padding must be zero or positive, got {}",
                self.boundary.padding
            )));
        }
        if self.boundary.samples < 3 {
            return Err(GenogramError::InvalidConfig(format!(
                "boundary.samples must be at least 3, got {}",
                self.boundary.samples
            )));
        }
        Ok(())
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "genodraw").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable override");
            None
        }
    }
}
