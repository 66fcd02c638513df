use std::{
  collections::BTreeMap,
  fs,
  path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::recipe::{ImportRule, Reference, Settings};

pub const CONFIG_FILE: &str = "Runcmd.toml";

/// Contents of a `Runcmd.toml`
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  /// Host build tool command, split like a shell would
  pub tool: String,
  pub build_dir: PathBuf,
  /// Replaces the default `configure build` arguments
  pub build: Option<Vec<String>>,
  /// Exit with the program's status instead of always succeeding
  pub strict: bool,
  pub requires: Vec<String>,
  pub dev_requires: Vec<String>,
  pub settings: Settings,
  pub env: BTreeMap<String, String>,
  pub imports: Vec<ImportRule>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      tool: "waf".to_string(),
      build_dir: PathBuf::from("build"),
      build: None,
      strict: false,
      requires: Vec::new(),
      dev_requires: Vec::new(),
      settings: Settings::default(),
      env: BTreeMap::new(),
      imports: Vec::new(),
    }
  }
}

impl Config {
  pub fn parse(content: &str) -> Result<Self> {
    let config: Config = toml::from_str(content).context("Invalid Runcmd.toml")?;
    for reference in config.requires.iter().chain(&config.dev_requires) {
      Reference::parse(reference)?;
    }
    Ok(config)
  }

  pub fn load(path: &Path) -> Result<Self> {
    let content = fs::read_to_string(path)
      .with_context(|| format!("Failed to read {}", path.display()))?;
    Self::parse(&content).with_context(|| format!("Failed to load {}", path.display()))
  }
}
