//! Obras CLI
//!
//! Command-line front-end for the construction-site photo portal: configure
//! the repository, review the dashboard and upload site photos.

mod commands;
mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use obras_core::{PortalConfig, ProjectId, ProjectStatus};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "obras", version, about = "Construction-site photo portal")]
struct Cli {
    /// Config file (default: <config dir>/obras-portal/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Save the repository and credential, then verify access
    Configure {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        repo: String,
        #[arg(long)]
        token: String,
        #[arg(long, default_value = "main")]
        branch: String,
        /// Save without probing the repository
        #[arg(long)]
        no_check: bool,
    },
    /// Verify the configured credential can reach the repository
    Check,
    /// Dashboard of every project
    Status {
        #[arg(long, value_enum)]
        filter: Option<StatusFilter>,
    },
    /// Gallery of one project
    Show { project: ProjectId },
    /// Upload a cover and progress photos for a project
    Upload {
        #[arg(long)]
        project: ProjectId,
        #[arg(long)]
        cover: Option<PathBuf>,
        /// Progress photos, numbered in the order given
        photos: Vec<PathBuf>,
        /// Run against an in-memory copy of the repository
        #[arg(long)]
        dry_run: bool,
    },
    /// One-step setup links
    SetupLink {
        #[command(subcommand)]
        command: SetupLinkCommand,
    },
}

#[derive(Subcommand)]
enum SetupLinkCommand {
    /// Print a link that configures the portal in one step
    Generate {
        /// Address of the published portal
        #[arg(long)]
        base_url: String,
    },
    /// Configure from a setup link
    Apply {
        link: String,
        #[arg(long)]
        no_check: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusFilter {
    NotStarted,
    InProgress,
    Completed,
}

impl From<StatusFilter> for ProjectStatus {
    fn from(filter: StatusFilter) -> Self {
        match filter {
            StatusFilter::NotStarted => ProjectStatus::NotStarted,
            StatusFilter::InProgress => ProjectStatus::InProgress,
            StatusFilter::Completed => ProjectStatus::Completed,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => PortalConfig::default_path()?,
    };

    match cli.command {
        Command::Configure {
            owner,
            repo,
            token,
            branch,
            no_check,
        } => commands::configure(&config_path, &owner, &repo, &token, &branch, !no_check).await,
        Command::Check => commands::check(&config_path).await,
        Command::Status { filter } => commands::status(&config_path, filter.map(Into::into)).await,
        Command::Show { project } => commands::show(&config_path, project).await,
        Command::Upload {
            project,
            cover,
            photos,
            dry_run,
        } => commands::upload(&config_path, project, cover, photos, dry_run).await,
        Command::SetupLink { command } => match command {
            SetupLinkCommand::Generate { base_url } => {
                commands::generate_setup_link(&config_path, &base_url)
            }
            SetupLinkCommand::Apply { link, no_check } => {
                commands::apply_setup_link(&config_path, &link, !no_check).await
            }
        },
    }
}
