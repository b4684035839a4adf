mod config;
mod error;
mod extract;
mod headers;
mod http_client;
mod models;
mod results;
mod scraper_trait;
mod scrapers;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use headers::PooledHeaders;
use http_client::HttpFetcher;
use results::ResultsScraper;
use scraper_trait::ScraperRegistry;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "housing-scraper")]
#[command(about = "Scrape rental listings from Dutch housing sites", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape every listing of a search, across all result pages
    Scrape {
        /// Source website (pararius, funda)
        source: String,
        search_url: String,
        /// Write the records to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Only list the listing URLs of a search
    Urls {
        source: String,
        search_url: String,
    },
    /// Scrape a single listing page
    Listing {
        source: String,
        listing_url: String,
    },
    /// Write a default data/config.yaml
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Command::InitConfig = args.command {
        Config::create_default()?;
        eprintln!("Wrote {}", config::CONFIG_PATH);
        return Ok(());
    }

    let config = Config::load()?;
    init_tracing(&config);

    let fetcher = Arc::new(HttpFetcher::new(config.request_timeout())?);
    let header_pool = Arc::new(PooledHeaders::load(config.headers_file.as_deref())?);
    let registry = scrapers::default_registry(fetcher, header_pool)?;
    tracing::debug!("Registered scrapers: {:?}", registry.list_scrapers());

    match args.command {
        Command::Scrape { source, search_url, output } => {
            scrape(&registry, &config, &source, &search_url, output).await
        }
        Command::Urls { source, search_url } => {
            let scraper = registry.get(&source)?;
            let results = ResultsScraper::new(scraper, search_url, config.page_delay());
            for url in results.discover_all_listing_urls().await? {
                println!("{}", url);
            }
            Ok(())
        }
        Command::Listing { source, listing_url } => {
            let scraper = registry.get(&source)?;
            let url = extract::absolute_url(scraper.base_url(), &listing_url);
            let markup = scraper.fetch_document(&url).await?;
            let record = scraper.parse_record(&markup, &url)?;
            let details = scraper.parse_details(&markup, &url)?;
            let output = serde_json::json!({ "record": record, "details": details });
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Command::InitConfig => Ok(()),
    }
}

/// Use RUST_LOG if set, otherwise the configured level
fn init_tracing(config: &Config) {
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
        tracing::debug!("Logging level set from RUST_LOG environment variable");
        return;
    }

    let level = config.tracing_level.to_lowercase();
    let max_level = match level.as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => {
            eprintln!("Invalid tracing level '{}', using 'info'", level);
            tracing::Level::INFO
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_writer(std::io::stderr)
        .init();
}

async fn scrape(
    registry: &ScraperRegistry,
    config: &Config,
    source: &str,
    search_url: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let scraper = registry.get(source)?;
    tracing::info!("Scraping {} search {}", scraper.name(), search_url);

    let results = ResultsScraper::new(scraper, search_url, config.page_delay());
    let records = results.scrape_all().await?;
    let json = serde_json::to_string_pretty(&records)?;

    match output {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {} records to {}", records.len(), path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
