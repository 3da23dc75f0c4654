use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use reviewminer::aggregations::{timestamp_key, SENTIMENT_FIELD};
use reviewminer::config::LoggingConfig;
use reviewminer::{
    flatten, flatten_each, Config, PathSelector, QuerySpec, QueryTarget, RawResponse,
    ReviewMiner, SliceOrder, ValueSource,
};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "reviewminer")]
#[command(about = "Review sentiment queries and chart-ready series")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.reviewminer/config.toml)
    #[arg(long, global = true, env = "REVIEWMINER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List environments visible to the configured credentials
    Environments,

    /// Run a query and print the raw response
    Query {
        /// Collection to query
        #[arg(short, long, default_value = "reviews")]
        target: QueryTarget,

        /// JSON query spec file, or "-" for stdin
        #[arg(short, long)]
        spec: String,
    },

    /// Flatten a saved response into chart series
    Flatten {
        /// JSON response file, or "-" for stdin
        #[arg(short, long)]
        input: String,

        #[command(flatten)]
        series: SeriesArgs,
    },

    /// Query per-hotel sentiment over time and print chart series
    Sentiment {
        #[arg(short, long, default_value = "reviews")]
        target: QueryTarget,

        /// JSON query spec file, or "-" for stdin (default: yearly average sentiment per hotel)
        #[arg(short, long)]
        spec: Option<String>,

        #[command(flatten)]
        series: SeriesArgs,
    },
}

#[derive(Args, Debug)]
struct SeriesArgs {
    /// Facet bucket to flatten (default: the first one)
    #[arg(long)]
    bucket_key: Option<String>,

    /// Flatten every facet bucket
    #[arg(long, conflicts_with = "bucket_key")]
    all: bool,

    /// Sort slices by key instead of keeping backend order
    #[arg(long)]
    sort: bool,

    /// Add document counts as a second series
    #[arg(long)]
    counts: bool,
}

impl SeriesArgs {
    fn apply(&self, mut selector: PathSelector) -> PathSelector {
        if let Some(key) = &self.bucket_key {
            selector = selector.bucket_key(key.clone());
        }
        if self.sort {
            selector = selector.order(SliceOrder::ByKey);
        }
        if self.counts {
            selector = selector.also_value(ValueSource::MatchingResults);
        }
        selector
    }

    fn print(&self, response: &RawResponse, selector: &PathSelector) -> Result<()> {
        let output = if self.all {
            serde_json::to_string_pretty(&flatten_each(response, selector)?)?
        } else {
            serde_json::to_string_pretty(&flatten(response, selector)?)?
        };
        println!("{}", output);
        Ok(())
    }
}

fn default_sentiment_spec() -> QuerySpec {
    QuerySpec::new()
        .aggregation(format!(
            "term(hotel).timeslice(date,1year).average({})",
            SENTIMENT_FIELD
        ))
        .count(0)
}

/// Read a file, or stdin for "-"
fn read_input(source: &str) -> Result<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(source).with_context(|| format!("Failed to read {}", source))
    }
}

fn read_spec(source: &str) -> Result<QuerySpec> {
    let value: serde_json::Value = serde_json::from_str(&read_input(source)?)
        .with_context(|| format!("Invalid JSON in query spec {}", source))?;
    Ok(QuerySpec::try_from(value)?)
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| logging.level.clone()),
    );
    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries command output
    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Environments => {
            let miner = ReviewMiner::from_config(&config)?;
            let environments = miner.environments().await?;
            println!("{}", serde_json::to_string_pretty(&environments)?);
        }
        Commands::Query { target, spec } => {
            let miner = ReviewMiner::from_config(&config)?;
            let spec = read_spec(&spec)?;
            tracing::info!("Querying {} with {} parameter(s)", target, spec.len());
            let response = miner.query(target, &spec).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Flatten { input, series } => {
            let response: RawResponse = serde_json::from_str(&read_input(&input)?)
                .with_context(|| format!("Invalid response document {}", input))?;
            let selector = series.apply(PathSelector::default().slice_key_format(timestamp_key));
            series.print(&response, &selector)?;
        }
        Commands::Sentiment {
            target,
            spec,
            series,
        } => {
            let miner = ReviewMiner::from_config(&config)?;
            let spec = match spec {
                Some(source) => read_spec(&source)?,
                None => default_sentiment_spec(),
            };
            let response = miner.query(target, &spec).await?;
            let selector = series.apply(PathSelector::sentiment_timeline());
            series.print(&response, &selector)?;
        }
    }

    Ok(())
}
