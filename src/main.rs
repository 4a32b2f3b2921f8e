use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use cellarscrape::{HtmlDocument, ScrapeConfig, SessionRunner, crawl};

#[derive(Parser)]
#[command(name = "cellarscrape", about = "Wine listing scraper with block detection")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl listing pages in Chrome and append records to a JSON lines file
    Crawl(CrawlArgs),
    /// Classify and extract a saved HTML page, printing records as JSON
    Extract {
        /// Saved HTML file
        file: PathBuf,
        /// URL the page was served from; relative links resolve against it
        #[arg(long)]
        url: String,
        /// Keep only this vintage
        #[arg(long)]
        vintage: Option<u16>,
    },
}

#[derive(Args)]
struct CrawlArgs {
    /// Listing URLs or site paths such as /find/opus+one
    urls: Vec<String>,
    /// JSON config file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Max records per start URL (0 = unlimited)
    #[arg(short = 'n', long)]
    max_records: Option<usize>,
    /// Keep only this vintage
    #[arg(long)]
    vintage: Option<u16>,
    #[arg(long)]
    country: Option<String>,
    #[arg(long)]
    currency: Option<String>,
    /// Record search cards instead of visiting each wine's page
    #[arg(long)]
    no_follow: bool,
    /// Drop analytics fields such as search rank
    #[arg(long)]
    no_analytics: bool,
    /// Show the browser window
    #[arg(long)]
    headed: bool,
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Seed for reproducible pacing
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    max_retries: Option<u32>,
}

impl CrawlArgs {
    fn into_config(self) -> Result<ScrapeConfig> {
        let mut builder = match self.config {
            Some(path) => {
                let base = ScrapeConfig::from_json_file(&path)
                    .with_context(|| format!("loading {}", path.display()))?;
                self.urls
                    .into_iter()
                    .fold(base.into_builder(), |b, url| b.add_start_url(url))
            }
            None => {
                let mut urls = self.urls.into_iter();
                let first = urls.next().context("no start URL given")?;
                urls.fold(ScrapeConfig::builder().start_url(first), |b, url| {
                    b.add_start_url(url)
                })
            }
        };

        if let Some(max) = self.max_records {
            builder = builder.max_records_per_search(max);
        }
        if let Some(vintage) = self.vintage {
            builder = builder.target_vintage(vintage);
        }
        if let Some(country) = self.country {
            builder = builder.country(country);
        }
        if let Some(currency) = self.currency {
            builder = builder.currency(currency);
        }
        if self.no_follow {
            builder = builder.follow_details(false);
        }
        if self.no_analytics {
            builder = builder.include_analytics(false);
        }
        if self.headed {
            builder = builder.headless(false);
        }
        if let Some(output) = self.output {
            builder = builder.output_path(output);
        }
        if let Some(seed) = self.seed {
            builder = builder.seed(seed);
        }
        if let Some(retries) = self.max_retries {
            builder = builder.max_retries(retries);
        }

        builder.build()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Crawl(args) => {
            let config = args.into_config()?;
            let output = config.output_path().to_path_buf();
            let summary = crawl(config).await?;
            println!(
                "{} records from {} pages written to {} ({} blocked, {} challenged, {} abandoned)",
                summary.records,
                summary.pages,
                output.display(),
                summary.blocked,
                summary.challenged,
                summary.abandoned.len()
            );
        }
        Commands::Extract { file, url, vintage } => {
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let document = HtmlDocument::parse_with_url(&html, &url)
                .with_context(|| format!("invalid URL {url}"))?;

            let mut builder = ScrapeConfig::builder()
                .start_url(url.as_str())
                .follow_details(false);
            if let Some(vintage) = vintage {
                builder = builder.target_vintage(vintage);
            }
            let config = builder.build()?;

            let mut session = SessionRunner::from_config("offline", &config);
            let outcome = session.process(&document)?;
            eprintln!("{} page, {} records", outcome.page_type, outcome.records.len());
            for record in &outcome.records {
                println!("{}", serde_json::to_string(record)?);
            }
            if let Some(next) = outcome.next_page {
                eprintln!("next page: {}", next.url);
            }
        }
    }

    Ok(())
}
