use std::{
  collections::HashMap,
  path::PathBuf,
  sync::{Mutex, MutexGuard, PoisonError},
};

use ansi_term::Colour;
use tracing::debug;

/// A build step that linked a program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramTarget {
  pub name: String,
  pub outputs: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
  Found(PathBuf),
  NotFound,
}

/// Programs produced by the current build, keyed by target name
#[derive(Default)]
pub struct ProgramRegistry {
  programs: Mutex<HashMap<String, PathBuf>>,
}

impl ProgramRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  fn programs_mut(&self) -> MutexGuard<'_, HashMap<String, PathBuf>> {
    // A panicked writer leaves the map itself intact
    self.programs.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Record `path` as the artifact for `name`, replacing any earlier entry
  pub fn register(&self, name: impl Into<String>, path: impl Into<PathBuf>) {
    let name = name.into();
    let path = path.into();
    debug!(program = %name, path = %path.display(), "registered program");
    self.programs_mut().insert(name, path);
  }

  /// Register the first output of a linked target. Targets without outputs
  /// are skipped.
  pub fn register_target(&self, target: &ProgramTarget) -> bool {
    match target.outputs.first() {
      Some(output) => {
        self.register(target.name.clone(), output.clone());
        true
      }
      None => {
        debug!(program = %target.name, "target has no outputs, not registered");
        false
      }
    }
  }

  pub fn lookup(&self, name: &str) -> Resolution {
    match self.programs_mut().get(name) {
      Some(path) => Resolution::Found(path.clone()),
      None => Resolution::NotFound,
    }
  }

  /// The registered path for `name`, or `name` itself so the shell can
  /// search for it
  pub fn resolve(&self, name: &str) -> PathBuf {
    match self.lookup(name) {
      Resolution::Found(path) => path,
      Resolution::NotFound => PathBuf::from(name),
    }
  }

  /// Snapshot of all entries, sorted by name
  pub fn programs(&self) -> Vec<(String, PathBuf)> {
    let mut programs: Vec<_> = self
      .programs_mut()
      .iter()
      .map(|(name, path)| (name.clone(), path.clone()))
      .collect();
    programs.sort();
    programs
  }

  /// One line per program: the name, padded to a common column, then its
  /// path. An empty registry lists as a single newline.
  pub fn listing(&self, colors: bool) -> String {
    let programs = self.programs();
    if programs.is_empty() {
      return "\n".to_string();
    }

    let width = programs.iter().map(|(name, _)| name.len()).max().unwrap_or(0) + 2;
    let mut output = String::new();
    for (name, path) in programs {
      let padding = " ".repeat(width - name.len());
      let path = path.display().to_string();
      if colors {
        output.push_str(&format!("{}{}{}\n", Colour::White.bold().paint(name), padding, Colour::Fixed(8).paint(path)));
      } else {
        output.push_str(&format!("{}{}{}\n", name, padding, path));
      }
    }
    output
  }

  pub fn len(&self) -> usize {
    self.programs_mut().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
