use std::{io::IsTerminal, path::PathBuf};

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use runcmd::{
  Pipeline,
  pipeline::locate_config,
  recipe::{BuildType, absolute},
};
use tracing::debug;

#[derive(Parser)]
#[command(
  name = "runcmd",
  version,
  about = "Build through a host build tool, then run a program it produced",
  after_help = "Append `run <program> [args...]` to build and execute a program.\n\
                Everything after the program name is passed to it unchanged."
)]
struct Cli {
  /// Host build tool command
  #[arg(long, env = "RUNCMD_TOOL", global = true)]
  tool: Option<String>,

  /// Exit with the program's own status
  #[arg(long, global = true)]
  strict: bool,

  /// More log output (-v info, -vv debug)
  #[arg(short, long, action = ArgAction::Count, global = true)]
  verbose: u8,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Configure and build through the host tool
  Build {
    #[arg(long, value_enum)]
    build_type: Option<BuildType>,

    /// Install prefix passed to the host tool
    #[arg(long)]
    prefix: Option<PathBuf>,
  },
  /// Install build outputs into the package folder
  Package,
  /// Copy files declared by import rules
  Imports,
  /// List declared dependency references
  Requires,
  /// Build and list the programs the host tool linked
  Programs,
}

fn main() -> Result<()> {
  let mut raw = std::env::args();
  let bin = raw.next().unwrap_or_else(|| "runcmd".to_string());
  let raw: Vec<String> = raw.collect();

  let filtered = runcmd::filter_arguments(&raw)?;
  let cli = Cli::parse_from(std::iter::once(bin).chain(filtered.host_args));
  runcmd::init_logging(cli.verbose);
  debug!(request = ?filtered.request, "parsed command line");

  let cwd = std::env::current_dir()?;
  let (root, mut config) = locate_config(&cwd)?;
  if let Some(tool) = cli.tool {
    config.tool = tool;
  }
  if cli.strict {
    config.strict = true;
  }
  if let Some(Commands::Build { build_type, prefix }) = &cli.command {
    if let Some(build_type) = build_type {
      config.settings.build_type = *build_type;
    }
    // A prefix typed on the command line is relative to where it was typed
    if let Some(prefix) = prefix {
      config.settings.package_folder = Some(absolute(&cwd, prefix));
    }
  }

  let pipeline = Pipeline::new(root, &config)?;
  let colors = std::io::stdout().is_terminal();

  let built = match cli.command {
    Some(Commands::Build { .. }) => {
      pipeline.build()?;
      true
    }
    Some(Commands::Programs) => {
      pipeline.build()?;
      print!("{}", pipeline.registry.listing(colors));
      true
    }
    Some(Commands::Package) => {
      pipeline.package()?;
      false
    }
    Some(Commands::Imports) => {
      for path in pipeline.imports()? {
        println!("{}", path.display());
      }
      false
    }
    Some(Commands::Requires) => {
      print!("{}", pipeline.recipe.requirements_listing(colors));
      false
    }
    None if filtered.request.is_none() => {
      pipeline.build()?;
      true
    }
    None => false,
  };

  if let Some(request) = filtered.request {
    if !built {
      pipeline.build()?;
    }
    let outcome = pipeline.execute(&request, &cwd);
    let code = pipeline.exit_code(&outcome);
    if code != 0 {
      std::process::exit(code);
    }
  }

  Ok(())
}
