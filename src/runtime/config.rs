use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::route_compute::RelaxationMode;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub relaxation: RelaxationMode,
    /// Order the queue by cost plus the metric's cost guess.
    pub heuristic: bool,
    /// Records kept per key; more than one yields k best walks per node.
    pub slots_per_key: usize,
    /// Skip replay and bound checks on returned paths.
    pub debug: bool,
    pub max_pops: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            relaxation: RelaxationMode::Auto,
            heuristic: false,
            slots_per_key: 1,
            debug: false,
            max_pops: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct RawEngine {
    relaxation: Option<String>,
    heuristic: Option<bool>,
    slots_per_key: Option<usize>,
    debug: Option<bool>,
    max_pops: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct RawEngineConfig {
    engine: Option<RawEngine>,
}

pub fn parse_engine_config(text: &str) -> Result<EngineConfig> {
    let raw_cfg: RawEngineConfig = if text.trim().is_empty() {
        RawEngineConfig::default()
    } else {
        serde_yaml::from_str(text).context("failed to parse engine config yaml")?
    };
    let raw = raw_cfg.engine.unwrap_or_default();
    let defaults = EngineConfig::default();

    let relaxation = match raw.relaxation {
        Some(name) => RelaxationMode::from_str(&name).map_err(anyhow::Error::msg)?,
        None => defaults.relaxation,
    };
    let slots_per_key = raw.slots_per_key.unwrap_or(defaults.slots_per_key);
    if slots_per_key == 0 {
        bail!("engine.slots_per_key must be at least 1");
    }
    if raw.max_pops == Some(0) {
        bail!("engine.max_pops must be at least 1 when set");
    }

    Ok(EngineConfig {
        relaxation,
        heuristic: raw.heuristic.unwrap_or(defaults.heuristic),
        slots_per_key,
        debug: raw.debug.unwrap_or(defaults.debug),
        max_pops: raw.max_pops,
    })
}

pub fn load_engine_config(path: &Path) -> Result<EngineConfig> {
    let raw_text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse_engine_config(&raw_text)
        .with_context(|| format!("invalid engine config in {}", path.display()))
}
