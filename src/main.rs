use clap::{Parser, Subcommand};
use dotenv::dotenv;
use ksa_events_scraper::apis::create_source;
use ksa_events_scraper::common::constants;
use ksa_events_scraper::common::Site;
use ksa_events_scraper::config::{Config, DEFAULT_CONFIG_PATH};
use ksa_events_scraper::infra::ScrapeContext;
use ksa_events_scraper::logging;
use ksa_events_scraper::pipeline::{Pipeline, RunOutcome};
use std::path::PathBuf;
use tracing::{error, info, warn, Instrument};

#[derive(Parser)]
#[command(name = "ksa_events_scraper")]
#[command(about = "Event scraper for Saudi listing sites (EyeOfRiyadh, Meetup, WeBook)")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML config file; defaults apply when it does not exist
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Directory for the CSV output
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Save every fetched body here for inspection
    #[arg(long, global = true)]
    dump_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape several sites in one run
    Scrape {
        /// Sites to scrape (comma-separated). Available: eye_of_riyadh, meetup, webook
        #[arg(long)]
        sites: Option<String>,
        /// Search term for EyeOfRiyadh and WeBook
        #[arg(long)]
        query: Option<String>,
        /// Fetch each EyeOfRiyadh detail page for the long description
        #[arg(long)]
        follow_details: bool,
    },
    /// Scrape the EyeOfRiyadh event listing
    EyeOfRiyadh {
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        follow_details: bool,
    },
    /// Scrape Meetup events in Saudi cities
    Meetup,
    /// Scrape WeBook experiences
    Webook {
        #[arg(long)]
        query: Option<String>,
    },
}

async fn run_site(site_name: &str, config: &Config, ctx: &ScrapeContext) {
    let site: Site = match site_name.parse() {
        Ok(site) => site,
        Err(e) => {
            warn!("{}", e);
            println!("⚠️  Unknown site: {}", site_name);
            return;
        }
    };

    let source = create_source(site, config);
    info!("Starting pipeline");
    match Pipeline::run_for_source(source.as_ref(), ctx, &config.output.dir).await {
        Ok(result) => {
            info!("Pipeline finished");
            println!("\n📊 Pipeline Results for {}:", site);
            println!("   Total events: {}", result.total_events);
            println!("   Saved: {}", result.saved_events);
            println!("   Skipped: {}", result.skipped_events);
            println!(
                "   Requests: {} succeeded, {} failed",
                result.pages_fetched, result.fetch_failures
            );
            for file in &result.output_files {
                println!("   Output file: {}", file.display());
            }

            match result.outcome() {
                RunOutcome::Extracted => {}
                RunOutcome::AllFetchesFailed => {
                    println!("\n⚠️  Every request failed; {} looks unreachable", site)
                }
                RunOutcome::NothingMatched => println!(
                    "\n⚠️  No events found. The site may list none, or its layout may have changed."
                ),
            }
        }
        Err(e) => {
            error!("Pipeline failed: {}", e);
        }
    }
}

async fn run_sites(site_names: &[String], config: &Config, ctx: &ScrapeContext) {
    for site_name in site_names {
        // The span rides on the future so it is only entered while the site is polled
        let span = tracing::info_span!("Running site", site = %site_name);
        run_site(site_name, config, ctx).instrument(span).await;
    }
}

fn split_sites(sites: Option<String>) -> Vec<String> {
    match sites {
        Some(list) => list
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        None => constants::get_supported_apis().into_iter().map(String::from).collect(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    // Initialize logging; the guard flushes the log file on exit
    let _log_guard = logging::init_logging();

    let cli = Cli::parse();

    let mut config = Config::load_from(&cli.config)?;
    if let Some(dir) = cli.output_dir {
        config.output.dir = dir;
    }
    if cli.dump_dir.is_some() {
        config.output.dump_dir = cli.dump_dir;
    }

    let site_names = match cli.command {
        Commands::Scrape { sites, query, follow_details } => {
            println!("🔄 Running scrapers...");
            if let Some(query) = query {
                config.eye_of_riyadh.query = query.clone();
                config.webook.query = query;
            }
            config.eye_of_riyadh.follow_details |= follow_details;
            split_sites(sites)
        }
        Commands::EyeOfRiyadh { query, follow_details } => {
            if let Some(query) = query {
                config.eye_of_riyadh.query = query;
            }
            config.eye_of_riyadh.follow_details |= follow_details;
            vec![constants::EYE_OF_RIYADH_API.to_string()]
        }
        Commands::Meetup => vec![constants::MEETUP_API.to_string()],
        Commands::Webook { query } => {
            if let Some(query) = query {
                config.webook.query = query;
            }
            vec![constants::WEBOOK_API.to_string()]
        }
    };

    let ctx = ScrapeContext::new(&config)?;
    run_sites(&site_names, &config, &ctx).await;

    let stats = ctx.fetcher.stats();
    info!("Done: {} requests, {} failed", stats.total(), stats.failed);
    ctx.shutdown().await;
    Ok(())
}
