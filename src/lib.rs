pub mod config;
pub mod phases;
pub mod pipeline;
pub mod recipe;

use anyhow::Result;
use std::io::Read;
use std::path::Path;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::phases::{BuildPhase, FilterPhase, ProgramRegistry};
use crate::phases::filter::FilteredArgs;

// Re-export the main Pipeline struct for convenience
pub use crate::pipeline::Pipeline;

/// Split a raw command line into host arguments and an optional run request
pub fn filter_arguments(args: &[String]) -> Result<FilteredArgs> {
  FilterPhase::new().filter(args)
}

/// Collect the programs reported in captured host build output; relative
/// outputs are taken from `base`
pub fn programs_from_log(log: impl Read, base: &Path) -> Result<ProgramRegistry> {
  let registry = ProgramRegistry::new();
  BuildPhase::new().harvest(std::io::BufReader::new(log), base, &registry, &mut std::io::sink())?;
  Ok(registry)
}

/// Send tracing output to stderr. `RUST_LOG` wins over `verbosity`.
pub fn init_logging(verbosity: u8) {
  let default_filter = match verbosity {
    0 => "runcmd=warn",
    1 => "runcmd=info",
    _ => "runcmd=debug",
  };

  let _ = tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
    .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
    .try_init();
}
