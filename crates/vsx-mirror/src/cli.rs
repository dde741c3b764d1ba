use crate::config::Overrides;
use clap::Parser;
use std::path::PathBuf;

/// Mirror Open VSX extensions, dependencies first, into another registry.
#[derive(Parser, Debug)]
#[command(name = "vsx-mirror", version, about)]
pub struct Cli {
    /// Extensions to mirror, as namespace.name
    #[arg(value_name = "IDS", required_unless_present = "all")]
    pub ids: Vec<String>,

    /// Mirror every extension listed in the upstream sitemap
    #[arg(long)]
    pub all: bool,

    /// JSON configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Registry to copy from
    #[arg(long, env = "OVSX_UPSTREAM_URL", value_name = "URL")]
    pub upstream: Option<String>,

    /// Registry to publish into
    #[arg(long, env = "OVSX_REGISTRY_URL", value_name = "URL")]
    pub downstream: Option<String>,

    /// Personal access token for the downstream registry
    #[arg(long, env = "OVSX_PAT", hide_env_values = true)]
    pub token: Option<String>,

    /// Directory where artifacts are staged before publishing
    #[arg(long, value_name = "DIR")]
    pub staging_dir: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            upstream_url: self.upstream.clone(),
            downstream_url: self.downstream.clone(),
            token: self.token.clone(),
            staging_dir: self.staging_dir.clone(),
        }
    }
}
