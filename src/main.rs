//! CLI entry point for decap-feed

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use decap_feed::config::DraftVisibility;
use decap_feed::Site;

#[derive(Parser)]
#[command(name = "decap-feed")]
#[command(version)]
#[command(about = "Turns Decap CMS markdown content into JSON feeds", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new draft post
    New {
        /// Title of the new post
        title: String,

        /// Slug for the new post (defaults to the slugified title)
        #[arg(short, long)]
        slug: Option<String>,
    },

    /// Generate the JSON feeds
    #[command(visible_alias = "build", alias = "g")]
    Generate {
        /// Include posts marked as drafts
        #[arg(long)]
        drafts: bool,

        /// Watch for content changes
        #[arg(short, long)]
        watch: bool,
    },

    /// Serve the feeds over a read-only JSON API
    #[command(alias = "s")]
    Server {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Include posts marked as drafts
        #[arg(long)]
        drafts: bool,

        /// Rebuild when content changes
        #[arg(short, long)]
        watch: bool,
    },

    /// Remove the output directory
    Clean,

    /// List site content
    List {
        /// Type of content to list (post, category, tag, author, movie)
        #[arg(default_value = "post")]
        r#type: String,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "decap_feed=debug,info"
    } else {
        "decap_feed=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to read the current directory")?,
    };

    match cli.command {
        Commands::New { title, slug } => {
            let site = open_site(&base_dir, false)?;
            let path = site.new_post(&title, slug.as_deref())?;
            println!("Created: {}", path.display());
        }

        Commands::Generate { drafts, watch } => {
            let site = open_site(&base_dir, drafts)?;
            tracing::info!("Generating JSON feeds...");

            decap_feed::commands::generate::run(&site)?;
            println!("Generated successfully!");

            if watch {
                decap_feed::commands::generate::watch(&site).await?;
            }
        }

        Commands::Server {
            port,
            ip,
            drafts,
            watch,
        } => {
            let site = open_site(&base_dir, drafts)?;
            tracing::info!("Starting server at http://{}:{}", ip, port);
            decap_feed::server::start(&site, &ip, port, watch).await?;
        }

        Commands::Clean => {
            let site = open_site(&base_dir, false)?;
            tracing::info!("Cleaning output folder...");
            site.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::List { r#type } => {
            let site = open_site(&base_dir, false)?;
            decap_feed::commands::list::run(&site, &r#type)?;
        }

        Commands::Version => {
            println!("decap-feed version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

/// Read `decap.yml`, overlay the deployment environment and CLI flags
fn open_site(base_dir: &Path, drafts: bool) -> Result<Site> {
    let mut config = Site::read_config(base_dir)?;
    config.apply_env(|key| std::env::var(key).ok());
    if drafts {
        config.drafts = DraftVisibility::Show;
    }
    Ok(Site::with_config(base_dir, config))
}
