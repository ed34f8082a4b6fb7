mod pipeline;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "vitrina")]
#[command(about = "Configurable product crawler and extraction pipeline")]
struct Cli {
    /// Path to the site configuration YAML (overrides VITRINA_SITE_CONFIG).
    #[arg(long, global = true)]
    site: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the crawl-and-extract pipeline until the target product count is
    /// reached, no URLs remain, or the process is interrupted.
    Crawl {
        /// Resume a previous execution number instead of starting a new one.
        #[arg(long)]
        execution: Option<u32>,
    },
    /// Print the sitemap groups discovered for the configured domain.
    ResolveSitemap,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let app = vitrina_core::load_app_config_from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&app.log_level)),
        )
        .init();

    let cli = Cli::parse();
    let site_path = cli.site.unwrap_or_else(|| app.site_config_path.clone());
    let site = vitrina_core::load_site_config(&site_path)?;

    match cli.command {
        Commands::Crawl { execution } => {
            pipeline::run_crawl(&app, &site, &site_path, execution).await
        }
        Commands::ResolveSitemap => pipeline::report_sitemaps(&app, &site).await,
    }
}
