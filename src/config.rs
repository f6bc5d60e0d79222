use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::coverage::{Classifier, SITE_RADIUS_KM};

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub coverage: CoverageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CoverageConfig {
    /// Service radius around point sites
    pub site_radius_km: f64,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            site_radius_km: SITE_RADIUS_KM,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. "info" or "canopy=debug"
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let radius = self.coverage.site_radius_km;
        if !radius.is_finite() || radius < 0.0 {
            anyhow::bail!("coverage.site_radius_km must be a non-negative number, got {}", radius);
        }
        Ok(())
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::with_radius_km(self.coverage.site_radius_km)
    }
}
