use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::synthesis::{ExecutionMode, PNProperties};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Dot,
    Json,
    Ron,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(Self::Text),
            "dot" => Ok(Self::Dot),
            "json" => Ok(Self::Json),
            "ron" => Ok(Self::Ron),
            other => anyhow::bail!("unknown output format `{other}`"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SynthConfig {
    /// Property list in the textual form, e.g. `"pure, safe"`.
    pub properties: String,
    pub parallel: bool,
    /// Worker threads for the parallel mode, 0 lets rayon decide.
    pub threads: usize,
    pub verify: bool,
    /// Cap on reachability states explored by `verify`.
    pub state_limit: usize,
    pub format: OutputFormat,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            properties: "none".to_string(),
            parallel: false,
            threads: 0,
            verify: false,
            state_limit: default_state_limit(),
            format: OutputFormat::Text,
        }
    }
}

impl SynthConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn properties(&self) -> Result<PNProperties> {
        self.properties
            .parse()
            .with_context(|| format!("invalid properties `{}`", self.properties))
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        if self.parallel {
            ExecutionMode::Parallel {
                threads: self.threads,
            }
        } else {
            ExecutionMode::Sequential
        }
    }
}

fn default_state_limit() -> usize {
    100_000
}
