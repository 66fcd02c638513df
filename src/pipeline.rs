use anyhow::{Result, anyhow};
use std::path::{Path, PathBuf};
use std::process::{Command as ProcessCommand, Stdio};
use tracing::{debug, warn};

use crate::config::{CONFIG_FILE, Config};
use crate::phases::{BuildPhase, ProgramRegistry, RunPhase};
use crate::phases::build::BuildReport;
use crate::phases::filter::RunRequest;
use crate::phases::run::ExecOutcome;
use crate::recipe::Recipe;

/// Everything one invocation needs, created once and passed by reference
pub struct Pipeline {
  pub build: BuildPhase,
  pub run: RunPhase,
  pub registry: ProgramRegistry,
  pub recipe: Recipe,
  pub root: PathBuf,
  pub strict: bool,
}

impl Pipeline {
  pub fn new(root: PathBuf, config: &Config) -> Result<Self> {
    Ok(Self {
      build: BuildPhase::new(),
      run: RunPhase::new(),
      registry: ProgramRegistry::new(),
      recipe: Recipe::from_config(config)?,
      root,
      strict: config.strict,
    })
  }

  /// Build through the host tool, filling the registry
  pub fn build(&self) -> Result<BuildReport> {
    let command = self.recipe.build_command(&self.root);
    let report = self
      .build
      .build(&command, &self.root, &self.recipe.env, &self.registry)?;
    debug!(programs = report.programs, lines = report.lines, "build finished");
    Ok(report)
  }

  /// Install the build outputs into the package folder
  pub fn package(&self) -> Result<()> {
    let command = self.recipe.package_command();
    let (program, args) = command
      .split_first()
      .ok_or_else(|| anyhow!("No build tool configured"))?;

    let status = ProcessCommand::new(program)
      .args(args)
      .current_dir(&self.root)
      .envs(&self.recipe.env)
      .stdout(Stdio::inherit())
      .stderr(Stdio::inherit())
      .status()?;
    if !status.success() {
      return Err(anyhow!("Command failed with {}", ExecOutcome::from(status)));
    }
    Ok(())
  }

  pub fn imports(&self) -> Result<Vec<PathBuf>> {
    self.recipe.imports(&self.root)
  }

  /// Execute a captured run request from `cwd`
  pub fn execute(&self, request: &RunRequest, cwd: &Path) -> ExecOutcome {
    self.run.run(request, &self.registry, cwd)
  }

  /// The exit code the wrapper should report after running a program.
  ///
  /// Lenient mode always reports success.
  pub fn exit_code(&self, outcome: &ExecOutcome) -> i32 {
    if !outcome.success() {
      warn!(outcome = ?outcome, "program did not exit cleanly");
    }
    if self.strict { outcome.exit_code() } else { 0 }
  }
}

/// Find a Runcmd.toml in `start` or one of its parents
pub fn find_config(start: &Path) -> Result<PathBuf> {
  find_config_within(start, None)
}

/// Like `find_config`, but never looks above `ceiling`
pub fn find_config_within(start: &Path, ceiling: Option<&Path>) -> Result<PathBuf> {
  let mut current_dir = start.to_path_buf();

  loop {
    let config_path = current_dir.join(CONFIG_FILE);
    if config_path.exists() {
      return Ok(config_path);
    }

    if ceiling == Some(current_dir.as_path()) {
      break;
    }
    if let Some(parent) = current_dir.parent() {
      current_dir = parent.to_path_buf();
    } else {
      break;
    }
  }

  Err(anyhow!("No {} found in current directory or parent directories", CONFIG_FILE))
}

/// The project root and its configuration; defaults rooted at `cwd` when no
/// config file exists
pub fn locate_config(cwd: &Path) -> Result<(PathBuf, Config)> {
  locate_config_within(cwd, None)
}

pub fn locate_config_within(cwd: &Path, ceiling: Option<&Path>) -> Result<(PathBuf, Config)> {
  match find_config_within(cwd, ceiling) {
    Ok(path) => {
      let config = Config::load(&path)?;
      let root = path.parent().map(Path::to_path_buf).unwrap_or_else(|| cwd.to_path_buf());
      debug!(config = %path.display(), "loaded configuration");
      Ok((root, config))
    }
    Err(_) => Ok((cwd.to_path_buf(), Config::default())),
  }
}
