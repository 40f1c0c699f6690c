use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

use scraping::courses::CourseScraper;
use scraping::disciplines::DisciplineScraper;
use search::SearchCache;
use server::services::{CourseDirectory, DisciplineDirectory};
use server::{build_app, AppState, Bootstrap, Config, Profile};

#[derive(Parser)]
#[command(name = "catalog-search")]
#[command(about = "Fuzzy search over the university catalog", long_about = None)]
struct Cli {
    /// Runtime profile
    #[arg(long = "env", value_enum, default_value_t = Profile::Development)]
    profile: Profile,
    /// Directory holding static files and the scrape cache
    #[arg(long, default_value = "Resources")]
    resources: PathBuf,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (the default)
    Serve,
    /// Run every scraper, persist the caches and exit
    BuildCache,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let config = Arc::new(Config::new(cli.profile, cli.resources, cli.port));
    let runtime = tokio::runtime::Runtime::new()?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let env = config.scrape_env()?;
            let boot = Arc::new(Bootstrap::new(env, Arc::new(SearchCache::new())));
            runtime.block_on(async {
                boot.launch::<DisciplineDirectory>();
                boot.launch::<CourseDirectory>();
            });
            // Every controller reaches a terminal state before we bind.
            boot.wait_all_blocking(runtime.handle())?;
            let state = AppState { config: config.clone(), boot };
            runtime.block_on(serve(state, &config))
        }
        Commands::BuildCache => runtime.block_on(build_cache(&config)),
    }
}

async fn serve(state: AppState, config: &Config) -> Result<()> {
    let app = build_app(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn build_cache(config: &Config) -> Result<()> {
    let env = config.scrape_env()?;
    scraping::store::refresh::<DisciplineScraper>(&env).await?;
    scraping::store::refresh::<CourseScraper>(&env).await?;
    tracing::info!(cache = %env.cache.cache_dir().display(), "all catalog caches written");
    Ok(())
}
