use anyhow::{Context, Result};
use arc_grants::api::{ArcGrantsClient, PageProgress, Paginator, StopReason};
use arc_grants::config::{find_config_file, get_config, load_config, Config};
use arc_grants::export::{export_all, OutputPaths};
use arc_grants::models::{ResultSet, SearchFilters};
use arc_grants::ui::PageSpinner;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// ARC Grants - Query the ARC grants search API and export the results
#[derive(Parser, Debug)]
#[command(name = "arc-grants")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query the ARC grants search API and export results to CSV and SQLite", long_about = None)]
struct Cli {
    /// Free text search query (passed to the API verbatim)
    #[arg(long)]
    search: Option<String>,

    /// Filter by scheme name
    #[arg(long)]
    scheme: Option<String>,

    /// Filter by administering organisation name
    #[arg(long)]
    admin_org: Option<String>,

    /// Filter by administering organisation short name
    #[arg(long)]
    admin_org_short: Option<String>,

    /// Filter by status (Active, Closed, etc.)
    #[arg(long)]
    status: Option<String>,

    /// Filter by funding commencement year (from)
    #[arg(long)]
    year_from: Option<u16>,

    /// Filter by funding commencement year (to)
    #[arg(long)]
    year_to: Option<u16>,

    /// Filter by minimum funding amount
    #[arg(long)]
    funding_from: Option<u64>,

    /// Filter by maximum funding amount
    #[arg(long)]
    funding_to: Option<u64>,

    /// Only grants with fellowships
    #[arg(long, value_name = "true|false", action = clap::ArgAction::Set, value_parser = clap::value_parser!(bool))]
    fellowships_only: Option<bool>,

    /// Only grants on the LIEF register
    #[arg(long, value_name = "true|false", action = clap::ArgAction::Set, value_parser = clap::value_parser!(bool))]
    lief_register: Option<bool>,

    /// Filter by 4-digit Field of Research code
    #[arg(long)]
    four_digit_for: Option<String>,

    /// Filter by 2-digit Field of Research code
    #[arg(long)]
    two_digit_for: Option<String>,

    /// Number of results per page (clamped to 1-1000, default 100)
    #[arg(long, allow_negative_numbers = true)]
    page_size: Option<i64>,

    /// Maximum number of pages to fetch (default: all)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_pages: Option<u32>,

    /// CSV output file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// SQLite output file
    #[arg(long)]
    sqlite: Option<PathBuf>,

    /// Export whatever was fetched before a failed page, then exit with the error
    #[arg(long)]
    keep_partial: bool,

    /// Grants search endpoint (overrides configuration)
    #[arg(long)]
    base_url: Option<String>,

    /// Request timeout in seconds (overrides configuration)
    #[arg(long)]
    timeout: Option<u64>,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging (can be used multiple times: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,
}

impl Cli {
    fn filters(&self) -> SearchFilters {
        SearchFilters {
            search: self.search.clone(),
            scheme: self.scheme.clone(),
            admin_org: self.admin_org.clone(),
            admin_org_short: self.admin_org_short.clone(),
            status: self.status.clone(),
            year_from: self.year_from,
            year_to: self.year_to,
            funding_from: self.funding_from,
            funding_to: self.funding_to,
            fellowships_only: self.fellowships_only,
            lief_register: self.lief_register,
            four_digit_for: self.four_digit_for.clone(),
            two_digit_for: self.two_digit_for.clone(),
        }
    }
}

fn load_settings(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(config_path) = &cli.config {
        load_config(config_path)
            .with_context(|| format!("Failed to load config {}", config_path.display()))?
    } else if let Some(config_path) = find_config_file() {
        tracing::info!("Using config file: {}", config_path.display());
        load_config(&config_path)
            .with_context(|| format!("Failed to load config {}", config_path.display()))?
    } else {
        get_config().context("Failed to read configuration from environment")?
    };

    if let Some(base_url) = &cli.base_url {
        config.api.base_url = base_url.clone();
    }
    if let Some(timeout) = cli.timeout {
        config.api.timeout_secs = timeout;
    }
    Ok(config)
}

fn export(results: &ResultSet, paths: &OutputPaths) -> Result<()> {
    export_all(results, paths).context("Export failed")?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("arc_grants={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    run(cli).await
}

/// Search, paginate and export; an `Err` becomes a non-zero exit status
async fn run(cli: Cli) -> Result<()> {
    let config = load_settings(&cli)?;

    let page_size = cli.page_size.unwrap_or(config.search.page_size);
    let params = cli.filters().build(page_size)?;
    if i64::from(params.page_size()) != page_size {
        tracing::warn!(
            requested = page_size,
            used = params.page_size(),
            "Page size clamped to the API limits"
        );
    }
    if let Some(filter) = params.filter() {
        tracing::info!("Using filter query: {}", filter);
    }

    let paths = OutputPaths::resolve(
        cli.csv.clone(),
        cli.sqlite.clone(),
        Path::new(&config.output.directory),
        chrono::Local::now(),
    );
    paths.validate()?;

    let client = ArcGrantsClient::from_config(&config.api)?;
    tracing::info!("Fetching data from {}", client.base_url());

    let spinner = PageSpinner::new("Fetching grants", !cli.quiet);
    let mut paginator = Paginator::new(&client, &params)
        .max_pages(cli.max_pages)
        .on_page(|progress: &PageProgress| spinner.update(progress));

    let outcome = paginator.run().await;
    let pages_fetched = paginator.pages_fetched();
    let results = paginator.into_result_set();

    let reason = match outcome {
        Ok(reason) => reason,
        Err(e) => {
            spinner.finish_with_error(&format!("Stopped after {} pages", pages_fetched));
            if cli.keep_partial && !results.is_empty() {
                tracing::warn!(
                    records = results.len(),
                    "Exporting partial results before reporting the error"
                );
                export(&results, &paths)?;
            }
            return Err(e).context("Failed to fetch grants");
        }
    };

    spinner.finish_with_success(&format!(
        "Fetched {} grants in {} pages",
        results.len(),
        pages_fetched
    ));
    if reason == StopReason::MaxPages {
        tracing::info!("Stopped at the --max-pages limit ({} pages)", pages_fetched);
    }
    if results.is_empty() {
        tracing::info!("No grants matched; writing empty outputs");
    }

    export(&results, &paths)?;

    if !cli.quiet {
        println!(
            "Export complete. {} grants saved to {} and {}",
            results.len(),
            paths.csv.display(),
            paths.sqlite.display()
        );
    }

    Ok(())
}
