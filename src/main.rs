#![deny(clippy::mod_module_files)]
use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod banner;
mod commands;
mod config;
mod error;
mod service;
mod session;
mod staging;
mod submission;

use config::PosterConfig;
use service::HttpPostingService;
use session::SessionSettings;

#[derive(Parser)]
#[command(
    name = "photo-poster",
    version,
    about = "Stage photos and publish them as one post through the posting service"
)]
struct Cli {
    /// Base URL of the posting service (overrides config and environment)
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stage photos, submit them as one post and wait for completion
    Post(commands::post::PostArgs),
    /// Print the latest completed post id
    Status,
    /// Compose a post from line commands on stdin
    Interactive,
    /// Write the effective configuration to the config file
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let mut config = PosterConfig::load()?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }

    match cli.command {
        Command::InitConfig => init_config(&config),
        command => run(command, config).await,
    }
}

async fn run(command: Command, config: PosterConfig) -> Result<()> {
    tracing::debug!("using posting service at {}", config.base_url);
    eprintln!("{}", banner::render(&config.title));

    let service = HttpPostingService::new(&config.base_url, config.request_timeout())?;
    let settings = SessionSettings::from_config(&config);
    let mut stdout = std::io::stdout();

    match command {
        Command::Post(args) => {
            let outcome = commands::post::handle(args, service, settings, &mut stdout).await?;
            if !outcome.is_complete() {
                anyhow::bail!("post did not complete: {}", outcome.label());
            }
        }
        Command::Status => {
            commands::status::handle(&service, &mut stdout).await?;
        }
        Command::Interactive => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            commands::interactive::handle(service, settings, stdin, &mut stdout).await?;
        }
        Command::InitConfig => init_config(&config)?,
    }

    Ok(())
}

fn init_config(config: &PosterConfig) -> Result<()> {
    let path = PosterConfig::config_file_path()?;
    config.save(&path)?;
    println!("wrote config to {}", path.display());
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
