use anyhow::{Result, anyhow};

/// The verb that starts a run request on the command line
pub const RUN_VERB: &str = "run";

/// A program to execute once the build has finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
  pub program: String,
  pub args: Vec<String>,
}

/// The command line split into what the host sees and what `run` captured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredArgs {
  pub host_args: Vec<String>,
  pub request: Option<RunRequest>,
}

#[derive(Default)]
pub struct FilterPhase;

impl FilterPhase {
  pub fn new() -> Self {
    Self
  }

  /// Split `args` at the first `run` token.
  ///
  /// The token after `run` names the program and everything after it is
  /// forwarded untouched, so the host parser only ever sees what precedes
  /// `run`. Without a `run` token the list comes back unchanged.
  pub fn filter(&self, args: &[String]) -> Result<FilteredArgs> {
    let Some(run_idx) = args.iter().position(|arg| arg == RUN_VERB) else {
      return Ok(FilteredArgs {
        host_args: args.to_vec(),
        request: None,
      });
    };

    let program = args
      .get(run_idx + 1)
      .ok_or_else(|| anyhow!("Missing program name after '{}'", RUN_VERB))?
      .clone();

    Ok(FilteredArgs {
      host_args: args[..run_idx].to_vec(),
      request: Some(RunRequest {
        program,
        args: args[run_idx + 2..].to_vec(),
      }),
    })
  }
}
