//! goci CLI entry point

use clap::Parser;
use goci::{GoOptions, RunOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// Run a project's CI pipeline locally
#[derive(Debug, Parser)]
#[command(name = "goci", version, about)]
struct Cli {
    /// Project directory
    #[arg(short = 'p', long = "project")]
    project: Option<PathBuf>,

    /// Pipeline definition (YAML); defaults to <project>/goci.yml, then the Go pipeline
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Remote used by the git push step
    #[arg(long, default_value = "origin")]
    remote: String,

    /// Branch used by the git push step
    #[arg(long, default_value = "main")]
    branch: String,

    /// Timeout for the git push step, in seconds
    #[arg(long = "push-timeout", default_value_t = 10)]
    push_timeout: u64,
}

impl From<Cli> for RunOptions {
    fn from(cli: Cli) -> Self {
        Self {
            project: cli.project,
            config: cli.config,
            go: GoOptions {
                remote: cli.remote,
                branch: cli.branch,
                push_timeout: Duration::from_secs(cli.push_timeout),
            },
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("goci v{}", env!("CARGO_PKG_VERSION"));

    let opts = RunOptions::from(Cli::parse());
    let mut stdout = std::io::stdout();

    match goci::run(&opts, &mut stdout).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // A step error already renders its cause; only glue errors need the chain.
            match e.downcast_ref::<goci::Error>() {
                Some(err) => eprintln!("{}", err),
                None => eprintln!("{:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}
