use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Settings for one regulation run. Every field has a default, so a config
/// file only needs to list what it changes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub propagation: PropagationConfig,
    pub adapter: AdapterConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    /// The propagator gives up after
    /// `step_budget_factor * trains * blocks` passes.
    pub step_budget_factor: usize,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        PropagationConfig {
            step_budget_factor: 10,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Read `eco_simulations` when a train result has both.
    pub prefer_eco: bool,
    /// Rename routes that set exactly one switch to that switch.
    pub collapse_switches: bool,
    pub simplify_identifiers: bool,
    pub strip_prefixes: Vec<String>,
    pub buffer_stop_marker: String,
    pub buffer_stop_label: String,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        AdapterConfig {
            prefer_eco: true,
            collapse_switches: true,
            simplify_identifiers: false,
            strip_prefixes: vec!["rt.".to_string(), "sw.".to_string()],
            buffer_stop_marker: "buffer_stop".to_string(),
            buffer_stop_label: "BS".to_string(),
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}
