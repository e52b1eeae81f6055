//! Participation Portal CLI
//!
//! Runs the dashboard API, the forum poller, or both in one process.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use participation_portal::{
    error::Result,
    models::Config,
    pipeline::{ApiSink, Ingestor, PostSink, Poller},
    server,
    services::{Classifier, ForumClient},
    storage::Store,
    utils::http,
};

/// Course forum participation tracker
#[derive(Parser, Debug)]
#[command(
    name = "portal",
    version,
    about = "Tracks AI-assisted participation posts from a course forum"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the dashboard API
    Serve {
        /// Listen port (overrides config and PORTAL_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Start with an empty store
        #[arg(long)]
        no_demo: bool,

        /// Also poll the forum and ingest into this process's store
        #[arg(long)]
        ingest: bool,
    },

    /// Poll the forum and deliver posts to a running portal
    Ingest {
        /// Poll once and exit
        #[arg(long)]
        once: bool,
    },

    /// Classify a single post and print the result
    Classify {
        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        body: String,

        #[arg(long, default_value = "")]
        category: String,
    },

    /// Validate the configuration
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn poller(config: &Arc<Config>, sink: Arc<dyn PostSink>) -> Result<Poller> {
    config.validate_for_ingest()?;

    let client = http::create_async_client(&config.ingest)?;
    let forum = ForumClient::new(client, config.forum.clone());
    let ingestor = Ingestor::new(Arc::clone(config), sink)?;

    Ok(Poller::new(
        forum,
        Arc::new(ingestor),
        config.ingest.max_concurrent,
    ))
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);
    config.apply_env();
    log::info!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Serve {
            port,
            no_demo,
            ingest,
        } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;
            let config = Arc::new(config);

            let store = Arc::new(Store::new());
            if config.server.seed_demo && !no_demo {
                let count = store.seed_demo();
                log::info!("Seeded {} demo posts", count);
            }

            if ingest {
                let mut poller = poller(&config, store.clone())?;
                tokio::spawn(async move { poller.run().await });
            }

            server::serve(&config.server, store).await?;
        }

        Command::Ingest { once } => {
            let config = Arc::new(config);
            let client = http::create_async_client(&config.ingest)?;
            let sink = Arc::new(ApiSink::new(client, config.ingest.api_base_url.clone()));
            log::info!("Delivering to {}", config.ingest.api_base_url);

            let mut poller = poller(&config, sink)?;
            if once {
                let outcome = poller.poll_once().await?;
                log::info!(
                    "Fetched {} threads: {} new, {} updated, {} delivered, {} submissions, {} filtered, {} failed",
                    outcome.fetched,
                    outcome.new,
                    outcome.updated,
                    outcome.delivered,
                    outcome.submissions,
                    outcome.filtered,
                    outcome.failures
                );
            } else {
                poller.run().await;
            }
        }

        Command::Classify {
            title,
            body,
            category,
        } => {
            let classifier = Classifier::new(&config.classifier)?;
            let annotation = classifier.classify(&title, &body, &category);
            println!("{}", serde_json::to_string_pretty(&annotation)?);
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "✓ Config OK ({} categories, {} assistants)",
                config.classifier.categories.len(),
                config.classifier.assistants.len()
            );

            match config.validate_for_ingest() {
                Ok(()) => log::info!("✓ Forum credentials present"),
                Err(e) => log::warn!("Ingestion not configured: {}", e),
            }
        }
    }

    Ok(())
}
