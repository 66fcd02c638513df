use std::{
  collections::BTreeMap,
  io::{BufRead, BufReader, Write},
  path::{Path, PathBuf},
  process::{Command as ProcessCommand, Stdio},
};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use tracing::{debug, warn};

use super::resolve::{ProgramRegistry, ProgramTarget};
use super::run::ExecOutcome;

/// A structured line emitted by the host build tool
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum BuildRecord {
  ProgramLinked {
    target: String,
    #[serde(default)]
    outputs: Vec<PathBuf>,
  },
  CompilerArtifact {
    target: ArtifactTarget,
    #[serde(default)]
    executable: Option<PathBuf>,
  },
  CompilerMessage {
    message: Diagnostic,
  },
  #[serde(other)]
  Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ArtifactTarget {
  pub name: String,
  #[serde(default)]
  pub kind: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Diagnostic {
  #[serde(default)]
  pub rendered: Option<String>,
}

impl BuildRecord {
  /// The linked program this record describes, if any
  pub fn program(&self) -> Option<ProgramTarget> {
    match self {
      BuildRecord::ProgramLinked { target, outputs } => Some(ProgramTarget {
        name: target.clone(),
        outputs: outputs.clone(),
      }),
      BuildRecord::CompilerArtifact {
        target,
        executable: Some(executable),
      } => Some(ProgramTarget {
        name: target.name.clone(),
        outputs: vec![executable.clone()],
      }),
      _ => None,
    }
  }
}

/// What a build reported back
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildReport {
  pub programs: usize,
  pub records: usize,
  pub lines: usize,
}

#[derive(Default)]
pub struct BuildPhase;

impl BuildPhase {
  pub fn new() -> Self {
    Self
  }

  /// Parse one line of host output as a build record
  pub fn parse_record(&self, line: &str) -> Option<BuildRecord> {
    let trimmed = line.trim();
    if !trimmed.starts_with('{') {
      return None;
    }
    match serde_json::from_str(trimmed) {
      Ok(record) => Some(record),
      Err(err) => {
        debug!(error = %err, "line looks like JSON but is not a build record");
        None
      }
    }
  }

  /// Read host output, registering every linked program and echoing
  /// everything that is not a build record to `output`.
  ///
  /// Lines are handled as raw bytes so output in any encoding passes
  /// through untouched. Relative program outputs are resolved against
  /// `base`, the directory the host tool ran in.
  pub fn harvest<R: BufRead>(
    &self,
    mut reader: R,
    base: &Path,
    registry: &ProgramRegistry,
    output: &mut dyn Write,
  ) -> Result<BuildReport> {
    let mut report = BuildReport::default();
    let mut line = Vec::new();

    loop {
      line.clear();
      let read = reader
        .read_until(b'\n', &mut line)
        .context("Failed to read build output")?;
      if read == 0 {
        break;
      }
      report.lines += 1;

      let text = String::from_utf8_lossy(&line);
      let Some(record) = self.parse_record(&text) else {
        output.write_all(&line)?;
        if !line.ends_with(b"\n") {
          output.write_all(b"\n")?;
        }
        continue;
      };
      report.records += 1;

      if let BuildRecord::CompilerMessage { message } = &record {
        if let Some(rendered) = &message.rendered {
          eprint!("{}", rendered);
        }
      }

      if let Some(mut target) = record.program() {
        for output_path in &mut target.outputs {
          if output_path.is_relative() {
            *output_path = base.join(&*output_path);
          }
        }
        if registry.register_target(&target) {
          report.programs += 1;
        }
      }
    }

    output.flush()?;
    Ok(report)
  }

  /// Run the host build tool in `cwd` and harvest its output.
  ///
  /// A failing host build is an error.
  pub fn build(
    &self,
    command: &[String],
    cwd: &Path,
    env: &BTreeMap<String, String>,
    registry: &ProgramRegistry,
  ) -> Result<BuildReport> {
    let (program, args) = command
      .split_first()
      .ok_or_else(|| anyhow!("No build tool configured"))?;

    debug!(command = ?command, cwd = %cwd.display(), "starting host build");

    let mut cmd = ProcessCommand::new(program);
    cmd
      .args(args)
      .current_dir(cwd)
      .envs(env)
      .stdin(Stdio::inherit())
      .stdout(Stdio::piped())
      .stderr(Stdio::inherit());

    let mut child = cmd
      .spawn()
      .with_context(|| format!("Failed to start build tool '{}'", program))?;

    let stdout = child
      .stdout
      .take()
      .ok_or_else(|| anyhow!("Build tool output was not captured"))?;
    let report = self.harvest(BufReader::new(stdout), cwd, registry, &mut std::io::stdout());

    let status = child.wait()?;
    if !status.success() {
      warn!(status = %status, "host build failed");
      return Err(anyhow!("Build failed with {}", ExecOutcome::from(status)));
    }

    report
  }
}
