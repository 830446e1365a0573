use anyhow::{Context, Result};
use clap::Parser;
use git_committer::config::Config;
use git_committer::logging;
use git_committer::server::{self, GitCommitter};
use std::path::PathBuf;
use tokio::io::BufReader;

/// Session-based git tools for automated agents, served over MCP stdio
#[derive(Parser, Debug)]
#[command(name = "git-committer", version, about)]
struct Cli {
    /// Configuration file (defaults to <config dir>/git-committer/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the repositories; overrides config and environment
    #[arg(long)]
    repos_dir: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Write the default configuration file and exit
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    logging::init_logging(logging::DEFAULT_FILTER, cli.log_json);

    if cli.init_config {
        let path = Config::init_default()?;
        eprintln!("Configuration written to {}", path.display());
        return Ok(());
    }

    let config = load_config(&cli)?;
    match &config.repos_root {
        Some(root) => tracing::info!(root = %root.display(), "repos root configured"),
        None => tracing::warn!("no repos root configured; open_repo will fail until one is set"),
    }

    let service = GitCommitter::new(config);
    let stdin = BufReader::new(tokio::io::stdin());
    server::serve(service, stdin, tokio::io::stdout()).await
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = Config::load_from_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            config.apply_env(|key| std::env::var(key).ok());
            config
        }
        None => Config::load()?,
    };

    if let Some(dir) = &cli.repos_dir {
        config.repos_root = Some(dir.clone());
    }
    Ok(config)
}
