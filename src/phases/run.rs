use std::{
  borrow::Cow,
  fmt,
  io::{IsTerminal, Write},
  path::{Component, Path, PathBuf},
  process::{Command as ProcessCommand, ExitStatus, Stdio},
};

use ansi_term::Colour;
use tracing::info;

use super::filter::RunRequest;
use super::resolve::ProgramRegistry;

/// How the shell command ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
  Exited(i32),
  Signaled(i32),
  LaunchFailed(String),
}

impl ExecOutcome {
  pub fn success(&self) -> bool {
    matches!(self, ExecOutcome::Exited(0))
  }

  /// Exit code following shell conventions: 128 + signal for a killed
  /// child, 127 when the shell itself could not be started
  pub fn exit_code(&self) -> i32 {
    match self {
      ExecOutcome::Exited(code) => *code,
      ExecOutcome::Signaled(signal) => 128 + signal,
      ExecOutcome::LaunchFailed(_) => 127,
    }
  }
}

impl fmt::Display for ExecOutcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ExecOutcome::Exited(code) => write!(f, "exit code: {}", code),
      ExecOutcome::Signaled(signal) => write!(f, "signal: {}", signal),
      ExecOutcome::LaunchFailed(cause) => write!(f, "launch failure: {}", cause),
    }
  }
}

impl From<ExitStatus> for ExecOutcome {
  fn from(status: ExitStatus) -> Self {
    if let Some(code) = status.code() {
      return ExecOutcome::Exited(code);
    }
    #[cfg(unix)]
    {
      use std::os::unix::process::ExitStatusExt;
      if let Some(signal) = status.signal() {
        return ExecOutcome::Signaled(signal);
      }
    }
    ExecOutcome::Exited(-1)
  }
}

pub struct RunPhase {
  pub colors: bool,
}

impl Default for RunPhase {
  fn default() -> Self {
    Self::new()
  }
}

impl RunPhase {
  pub fn new() -> Self {
    Self {
      colors: std::io::stdout().is_terminal(),
    }
  }

  pub fn with_colors(colors: bool) -> Self {
    Self { colors }
  }

  /// Resolve, render and execute a captured run request
  pub fn run(&self, request: &RunRequest, registry: &ProgramRegistry, cwd: &Path) -> ExecOutcome {
    let command_line = self.render(request, registry, cwd);
    self.execute(&command_line, cwd)
  }

  pub fn render(&self, request: &RunRequest, registry: &ProgramRegistry, cwd: &Path) -> String {
    let program = registry.resolve(&request.program);
    self.command_line(&program, &request.args, cwd)
  }

  /// Join the program and its arguments into one shell command string
  pub fn command_line(&self, program: &Path, args: &[String], cwd: &Path) -> String {
    let program = display_program(program, cwd);
    let mut parts = vec![quote_arg(&program).into_owned()];
    parts.extend(args.iter().map(|arg| quote_arg(arg).into_owned()));
    parts.join(" ")
  }

  /// Run `command_line` through the platform shell in `cwd` and wait for it.
  ///
  /// Output streams are inherited. There is no timeout.
  pub fn execute(&self, command_line: &str, cwd: &Path) -> ExecOutcome {
    self.announce(command_line, &mut std::io::stdout());

    let mut cmd = shell_command(command_line);
    cmd
      .current_dir(cwd)
      .stdin(Stdio::inherit())
      .stdout(Stdio::inherit())
      .stderr(Stdio::inherit());

    match cmd.status() {
      Ok(status) => ExecOutcome::from(status),
      Err(err) => ExecOutcome::LaunchFailed(err.to_string()),
    }
  }

  fn announce(&self, command_line: &str, output: &mut dyn Write) {
    info!(command = %command_line, "running program");
    let line = format!("Run: {}", command_line);
    let result = if self.colors {
      writeln!(output, "{}", Colour::Blue.paint(line))
    } else {
      writeln!(output, "{}", line)
    };
    // Losing the console line must not stop the program from running
    let _ = result.and_then(|_| output.flush());
  }
}

#[cfg(unix)]
fn shell_command(command_line: &str) -> ProcessCommand {
  let mut cmd = ProcessCommand::new("sh");
  cmd.arg("-c").arg(command_line);
  cmd
}

#[cfg(windows)]
fn shell_command(command_line: &str) -> ProcessCommand {
  let mut cmd = ProcessCommand::new("cmd");
  cmd.arg("/C").arg(command_line);
  cmd
}

/// Quote `arg` as a single shell word when it contains whitespace
pub fn quote_arg(arg: &str) -> Cow<'_, str> {
  if arg.chars().any(char::is_whitespace) {
    shell_quote(arg)
  } else {
    Cow::Borrowed(arg)
  }
}

#[cfg(unix)]
fn shell_quote(arg: &str) -> Cow<'_, str> {
  shell_words::quote(arg)
}

/// `cmd.exe` only groups words with double quotes
#[cfg(windows)]
fn shell_quote(arg: &str) -> Cow<'_, str> {
  Cow::Owned(format!("\"{}\"", arg.replace('"', "\\\"")))
}

/// How a program path appears in the command line.
///
/// Absolute paths are shown relative to `cwd`. A bare file name gets a
/// `./` prefix, otherwise the shell would search `PATH` for it.
pub fn display_program(program: &Path, cwd: &Path) -> String {
  if !program.is_absolute() {
    return program.to_string_lossy().into_owned();
  }

  match relative_to(program, cwd) {
    Some(relative) if relative.components().count() == 1 => {
      format!(".{}{}", std::path::MAIN_SEPARATOR, relative.to_string_lossy())
    }
    Some(relative) => relative.to_string_lossy().into_owned(),
    None => program.to_string_lossy().into_owned(),
  }
}

/// `path` expressed relative to `base`, or `None` when they share no root
pub fn relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
  let mut path_components = path.components().peekable();
  let mut base_components = base.components().peekable();

  match (path_components.peek(), base_components.peek()) {
    (Some(a), Some(b)) if a == b => {}
    _ => return None,
  }

  while let (Some(a), Some(b)) = (path_components.peek(), base_components.peek()) {
    if a != b {
      break;
    }
    path_components.next();
    base_components.next();
  }

  let mut relative = PathBuf::new();
  for component in base_components {
    match component {
      Component::Normal(_) => relative.push(".."),
      Component::CurDir => {}
      _ => return None,
    }
  }
  for component in path_components {
    relative.push(component);
  }

  if relative.as_os_str().is_empty() {
    relative.push(".");
  }
  Some(relative)
}
