//! Process-wide settings, fixed once the pipeline is built.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, SliceError};
use crate::extract::DEFAULT_TARGET_SIZE;

/// Where the external models should run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Cpu,
    Cuda,
}

impl std::str::FromStr for Device {
    type Err = SliceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Device::Cpu),
            "cuda" | "gpu" => Ok(Device::Cuda),
            other => Err(SliceError::Config(format!("unknown device '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliceConfig {
    /// Minimum detector confidence for a box to be kept
    pub box_threshold: f32,
    /// Minimum label-match score against the class vocabulary
    pub text_threshold: f32,
    /// Label vocabulary handed to the detector
    pub classes: Vec<String>,
    /// Output canvas (width, height)
    pub target_size: (u32, u32),
    pub device: Device,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Default for SliceConfig {
    fn default() -> Self {
        Self {
            box_threshold: 0.35,
            text_threshold: 0.25,
            classes: vec!["packet".to_string()],
            target_size: DEFAULT_TARGET_SIZE,
            device: Device::Cpu,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

/// Command-line values that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub box_threshold: Option<f32>,
    pub text_threshold: Option<f32>,
    /// Replaces the whole vocabulary when non-empty
    pub classes: Vec<String>,
    /// Square canvas side
    pub target_size: Option<u32>,
    pub log_file: Option<PathBuf>,
}

impl SliceConfig {
    /// Apply `overrides` on top of this config and validate the result
    pub fn apply_overrides(mut self, overrides: &ConfigOverrides) -> Result<Self> {
        if let Some(v) = overrides.box_threshold {
            self.box_threshold = v;
        }
        if let Some(v) = overrides.text_threshold {
            self.text_threshold = v;
        }
        if !overrides.classes.is_empty() {
            self.classes = overrides.classes.clone();
        }
        if let Some(n) = overrides.target_size {
            self.target_size = (n, n);
        }
        if let Some(path) = &overrides.log_file {
            self.log_file = Some(path.clone());
        }
        self.validate()?;
        Ok(self)
    }

    /// Load from a JSON file; missing fields take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: SliceConfig = serde_json::from_str(&text)
            .map_err(|e| SliceError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("box_threshold", self.box_threshold), ("text_threshold", self.text_threshold)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SliceError::Config(format!("{} must be within [0, 1], got {}", name, value)));
            }
        }
        if self.classes.is_empty() || self.classes.iter().any(|c| c.trim().is_empty()) {
            return Err(SliceError::Config("classes must list at least one non-empty label".to_string()));
        }
        if self.target_size.0 == 0 || self.target_size.1 == 0 {
            return Err(SliceError::Config(format!(
                "target_size must be non-zero, got {}x{}",
                self.target_size.0, self.target_size.1
            )));
        }
        Ok(())
    }
}
