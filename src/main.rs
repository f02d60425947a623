//! webtrawl command-line entry point

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use webtrawl::config::load_config_with_hash;
use webtrawl::crawler::{crawl, Stage};
use tracing_subscriber::EnvFilter;

/// webtrawl: a polite, resumable multi-domain web crawler
///
/// Fetches landing pages, robots policies, and sitemaps for every seed
/// domain, optionally spiders in-domain links to a configured depth, and
/// stores raw responses for downstream analysis.
#[derive(Parser, Debug)]
#[command(name = "webtrawl")]
#[command(version = "0.3.0")]
#[command(about = "A polite, resumable multi-domain web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Stage to run: crawl or spider (both, in order, when omitted)
    #[arg(long, value_name = "STAGE")]
    stage: Option<Stage>,

    /// Extra seed domain (repeatable)
    #[arg(short = 'o', long = "domain")]
    domains: Vec<String>,

    /// File with one seed domain per line (or a CSV with a dom_tld column)
    #[arg(short = 'f', long = "domains-file")]
    domains_file: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Resume previous state, overriding the config
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Ignore previous state, overriding the config
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Validate config and show the crawl plan without fetching
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded (hash: {})", config_hash);

    // Merge command-line seeds and flags into the config
    config.domains.extend(cli.domains.iter().cloned());
    if let Some(path) = &cli.domains_file {
        let file_domains = load_domains_file(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        tracing::info!("Loaded {} domains from {}", file_domains.len(), path.display());
        config.domains.extend(file_domains);
    }
    if cli.resume {
        config.storage.resume = true;
    }
    if cli.fresh {
        config.storage.resume = false;
    }

    if config.domains.is_empty() {
        anyhow::bail!("no seed domains: provide them in the config, via -o, or via -f");
    }

    let stages: Vec<Stage> = match cli.stage {
        Some(stage) => vec![stage],
        None => vec![Stage::Crawl, Stage::Spider],
    };

    if cli.dry_run {
        print_dry_run(&config, &stages);
        return Ok(());
    }

    for stage in stages {
        let summary = crawl(config.clone(), stage).await?;
        tracing::info!(
            "Stage {} done: {} responses, {} bytes, {}/{} domains finished in {:.1}s",
            stage.as_str(),
            summary.processed,
            summary.bytes_fetched,
            summary.finished_domains,
            summary.registered_domains,
            summary.duration.as_secs_f64(),
        );
    }

    Ok(())
}

/// Sets up the tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("webtrawl=info,warn"),
            1 => EnvFilter::new("webtrawl=debug,info"),
            2 => EnvFilter::new("webtrawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Reads seed domains from a plain list or a CSV with a domain column
fn load_domains_file(path: &std::path::Path) -> std::io::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    let mut lines = content.lines().peekable();

    // A header row selects CSV mode; otherwise every line is a domain
    let column = lines.peek().and_then(|first| {
        first
            .split(',')
            .position(|c| matches!(c.trim().to_lowercase().as_str(), "dom_tld" | "domain"))
    });

    let domains = match column {
        Some(idx) => lines
            .skip(1)
            .filter_map(|line| line.split(',').nth(idx))
            .map(|d| d.trim().trim_matches('"').to_string())
            .filter(|d| !d.is_empty())
            .collect(),
        None => lines
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_string)
            .collect(),
    };
    Ok(domains)
}

/// Prints the crawl plan for --dry-run
fn print_dry_run(config: &webtrawl::Config, stages: &[Stage]) {
    println!("=== webtrawl dry run ===\n");

    println!("Crawler:");
    println!("  Workers: {}", config.crawler.pools);
    println!("  In-flight per worker: {}", config.crawler.async_block_size);
    println!("  Engines: {}", config.crawler.engines.join(", "));
    println!("  Timeout: {}s", config.crawler.timeout);
    println!("  Max pages per domain: {}", config.crawler.max_pages_per_domain);
    println!(
        "  Depth limits: websites={} sitemaps={}",
        config.crawler.websites_max_depth, config.crawler.sitemaps_max_depth
    );
    println!("  Crawl methods: {}", config.crawler.crawl_methods.join(", "));

    println!("\nStorage:");
    println!("  User folder: {}", config.storage.user_folder);
    println!("  Dump rotation: {} bytes", config.storage.max_dump_size);
    println!("  Resume: {}", config.storage.resume);

    println!("\nUser agent: {}", config.user_agent.header_value());

    println!(
        "\nStages: {}",
        stages.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(" -> ")
    );

    println!("\nSeed domains ({}):", config.domains.len());
    for domain in &config.domains {
        println!("  - {}", domain);
    }

    println!("\n✓ Configuration is valid");
}
