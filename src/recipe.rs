//! Packaging recipe: maps build settings onto host tool command lines,
//! copies imported artifacts and describes declared dependencies.

use std::{
  collections::BTreeMap,
  fmt, fs,
  path::{Path, PathBuf},
};

use ansi_term::Colour;
use anyhow::{Context, Result, anyhow};
use clap::ValueEnum;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
pub enum BuildType {
  #[serde(alias = "debug")]
  Debug,
  #[default]
  #[serde(alias = "release")]
  Release,
  RelWithDebInfo,
  MinSizeRel,
}

impl BuildType {
  /// The host tool flag for this build type; only `Debug` builds without
  /// optimisation
  pub fn flag(self) -> &'static str {
    match self {
      BuildType::Debug => "--debug",
      _ => "--release",
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
  pub build_type: BuildType,
  pub package_folder: Option<PathBuf>,
}

/// Copy files whose name matches `pattern` from `src` into `dst`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportRule {
  pub pattern: String,
  #[serde(default)]
  pub src: PathBuf,
  #[serde(default)]
  pub dst: PathBuf,
}

/// A dependency coordinate: `name/version@user/channel`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
  pub name: String,
  pub version: String,
  pub user: String,
  pub channel: String,
}

impl Reference {
  pub fn parse(reference: &str) -> Result<Self> {
    let part = r"[A-Za-z0-9_][A-Za-z0-9_+.\-]*";
    let pattern = Regex::new(&format!("^({part})/({part})@({part})/({part})$"))?;
    let captures = pattern
      .captures(reference.trim())
      .ok_or_else(|| anyhow!("Invalid package reference '{}', expected name/version@user/channel", reference))?;

    Ok(Self {
      name: captures[1].to_string(),
      version: captures[2].to_string(),
      user: captures[3].to_string(),
      channel: captures[4].to_string(),
    })
  }
}

impl fmt::Display for Reference {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}@{}/{}", self.name, self.version, self.user, self.channel)
  }
}

/// Translate a file-name glob (`*`, `?`) into an anchored regex
pub fn glob_to_regex(pattern: &str) -> Result<Regex> {
  let mut regex = String::from("^");
  for c in pattern.chars() {
    match c {
      '*' => regex.push_str(".*"),
      '?' => regex.push('.'),
      _ => regex.push_str(&regex::escape(&c.to_string())),
    }
  }
  regex.push('$');
  Regex::new(&regex).with_context(|| format!("Invalid import pattern '{}'", pattern))
}

/// `path` joined onto `base` unless it is already absolute
pub fn absolute(base: &Path, path: &Path) -> PathBuf {
  if path.is_absolute() {
    path.to_path_buf()
  } else {
    base.join(path)
  }
}

#[derive(Debug, Clone)]
pub struct Recipe {
  pub tool: Vec<String>,
  pub build_dir: PathBuf,
  pub build: Option<Vec<String>>,
  pub settings: Settings,
  pub env: BTreeMap<String, String>,
  pub imports: Vec<ImportRule>,
  pub requires: Vec<Reference>,
  pub dev_requires: Vec<Reference>,
}

impl Recipe {
  pub fn from_config(config: &Config) -> Result<Self> {
    let tool = shell_words::split(&config.tool)
      .with_context(|| format!("Invalid build tool command '{}'", config.tool))?;
    if tool.is_empty() {
      return Err(anyhow!("No build tool configured"));
    }

    let parse_all = |references: &[String]| -> Result<Vec<Reference>> {
      references.iter().map(|r| Reference::parse(r)).collect()
    };

    Ok(Self {
      tool,
      build_dir: config.build_dir.clone(),
      build: config.build.clone(),
      settings: config.settings.clone(),
      env: config.env.clone(),
      imports: config.imports.clone(),
      requires: parse_all(&config.requires)?,
      dev_requires: parse_all(&config.dev_requires)?,
    })
  }

  /// Where `install` puts the package; `<root>/package` unless configured
  pub fn package_folder(&self, root: &Path) -> PathBuf {
    match &self.settings.package_folder {
      Some(folder) => absolute(root, folder),
      None => root.join("package"),
    }
  }

  /// Host tool flags derived from the settings
  pub fn options(&self, root: &Path) -> Vec<String> {
    vec![
      self.settings.build_type.flag().to_string(),
      format!("--prefix={}", self.package_folder(root).display()),
    ]
  }

  /// `<tool> configure build <options> -o <build dir>`, or the tool with
  /// custom build arguments when those are configured
  pub fn build_command(&self, root: &Path) -> Vec<String> {
    let mut command = self.tool.clone();
    match &self.build {
      Some(args) => command.extend(args.iter().cloned()),
      None => {
        command.push("configure".to_string());
        command.push("build".to_string());
        command.extend(self.options(root));
        command.push("-o".to_string());
        command.push(absolute(root, &self.build_dir).display().to_string());
      }
    }
    command
  }

  pub fn package_command(&self) -> Vec<String> {
    let mut command = self.tool.clone();
    command.push("install".to_string());
    command
  }

  /// Declared dependencies grouped under `requires` and `dev_requires`
  pub fn requirements_listing(&self, colors: bool) -> String {
    let mut output = String::new();
    for (heading, references) in [("requires", &self.requires), ("dev_requires", &self.dev_requires)] {
      if references.is_empty() {
        continue;
      }
      if colors {
        output.push_str(&format!("{}\n", Colour::White.bold().paint(heading)));
      } else {
        output.push_str(&format!("{}\n", heading));
      }
      for reference in references {
        output.push_str(&format!("  {}\n", reference));
      }
    }
    output
  }

  /// Apply every import rule, returning the copied files
  pub fn imports(&self, root: &Path) -> Result<Vec<PathBuf>> {
    let mut copied = Vec::new();

    for rule in &self.imports {
      let matcher = glob_to_regex(&rule.pattern)?;
      let src = absolute(root, &rule.src);
      let dst = absolute(root, &rule.dst);

      if !src.is_dir() {
        debug!(src = %src.display(), pattern = %rule.pattern, "import source missing, skipped");
        continue;
      }

      let mut entries: Vec<PathBuf> = fs::read_dir(&src)
        .with_context(|| format!("Failed to read import source {}", src.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
      entries.sort();

      for path in entries {
        let Some(file_name) = path.file_name() else {
          continue;
        };
        if !matcher.is_match(&file_name.to_string_lossy()) {
          continue;
        }

        fs::create_dir_all(&dst)
          .with_context(|| format!("Failed to create {}", dst.display()))?;
        let target = dst.join(file_name);
        fs::copy(&path, &target)
          .with_context(|| format!("Failed to copy {} to {}", path.display(), target.display()))?;
        debug!(from = %path.display(), to = %target.display(), "imported");
        copied.push(target);
      }
    }

    Ok(copied)
  }
}
