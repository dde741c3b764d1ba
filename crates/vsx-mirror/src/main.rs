use clap::Parser;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;
use vsx_mirror::cli::Cli;
use vsx_mirror::{Mirror, MirrorConfig};

const EXIT_SEED_FAILURE: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => MirrorConfig::load(path),
        None => Ok(MirrorConfig::default()),
    };
    let mirror = config.and_then(|mut config| {
        config.apply(cli.overrides());
        Mirror::new(config)
    });
    let mirror = match mirror {
        Ok(mirror) => mirror,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let seeds = match mirror.collect_seeds(&cli.ids, cli.all).await {
        Ok(seeds) => seeds,
        Err(e) => {
            error!(error = %e, "failed to collect seeds");
            return ExitCode::from(EXIT_SEED_FAILURE);
        }
    };

    let report = mirror.sync(&seeds).await;
    println!("{report}");
    ExitCode::SUCCESS
}
