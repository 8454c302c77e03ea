//! rustpubmed - PubMed Industry-Affiliation Finder
//!
//! Finds PubMed papers with at least one author from a pharmaceutical or
//! biotech company and exports them as CSV.
//!
//! ## Usage
//!
//! ### CLI Mode
//! ```bash
//! rustpubmed search "cancer immunotherapy" -f results.csv --detailed
//! ```
//!
//! ### HTTP Server Mode
//! ```bash
//! rustpubmed serve --port 5000
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rustpubmed::{
    classifier::AffiliationClassifier,
    config::ScoringConfig,
    models::Paper,
    output,
    pubmed::PubMedClient,
    report::{build_report, SearchSummary},
    server::{self, AppState},
};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

/// Papers shown in the preview after an export
const PREVIEW_PAPERS: usize = 5;

/// Industry authors listed per preview row
const PREVIEW_AUTHORS: usize = 2;

/// Title width in the preview
const PREVIEW_TITLE_CHARS: usize = 50;

// ============================================================================
// CLI Definition
// ============================================================================

/// PubMed Industry-Affiliation Finder - Rust Microservice
#[derive(Parser)]
#[command(name = "rustpubmed")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Scoring config file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search PubMed for papers with industry-affiliated authors
    Search {
        /// PubMed query (full PubMed syntax supported)
        query: String,

        /// CSV output file; prints to stdout when omitted
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Maximum number of results to retrieve
        #[arg(short = 'n', long, default_value = "20")]
        max_results: usize,

        /// Contact email sent to NCBI
        #[arg(short, long, env = "NCBI_EMAIL")]
        email: Option<String>,

        /// NCBI API key for higher rate limits
        #[arg(long, env = "NCBI_API_KEY")]
        api_key: Option<String>,

        /// Also write a per-author report next to the output file
        #[arg(long)]
        detailed: bool,
    },

    /// Run as HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "5000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Default contact email sent to NCBI
        #[arg(short, long, env = "NCBI_EMAIL")]
        email: Option<String>,

        /// NCBI API key for higher rate limits
        #[arg(long, env = "NCBI_API_KEY")]
        api_key: Option<String>,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so console CSV output stays clean
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();

    let config = ScoringConfig::load(cli.config.as_deref()).context("Failed to load scoring config")?;
    let classifier = AffiliationClassifier::new(&config).context("Invalid scoring config")?;

    match cli.command {
        Commands::Search {
            query,
            file,
            max_results,
            email,
            api_key,
            detailed,
        } => {
            let client = PubMedClient::new(email, api_key)?;
            run_search(&client, &classifier, &query, max_results, file.as_deref(), detailed).await
        }
        Commands::Serve {
            port,
            host,
            email,
            api_key,
        } => run_server(classifier, host, port, email, api_key).await,
    }
}

// ============================================================================
// Search Pipeline
// ============================================================================

async fn run_search(
    client: &PubMedClient,
    classifier: &AffiliationClassifier,
    query: &str,
    max_results: usize,
    file: Option<&Path>,
    detailed: bool,
) -> Result<()> {
    if query.trim().is_empty() {
        bail!("Query must not be empty");
    }

    eprintln!("Query: {}", query);
    eprintln!("Max results: {}", max_results);

    // Step 1: Search
    let ids = client.search(query, max_results).await.context("PubMed search failed")?;
    eprintln!("Found {} papers", ids.len());
    if ids.is_empty() {
        bail!("No papers found for the given query");
    }

    // Step 2: Fetch and parse
    let papers = client
        .fetch_papers(&ids)
        .await
        .context("Failed to fetch paper details")?;
    eprintln!("Parsed {} papers", papers.len());

    // Step 3: Classify
    let report = build_report(classifier, query, &papers);
    eprintln!("Found {} papers with industry authors", report.summary.papers_with_industry);

    // Step 4: Export
    match file {
        Some(path) => {
            output::export_papers(path, classifier, &papers)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if detailed {
                if let Some(detailed_path) = output::export_detailed_report(path, classifier, &papers)? {
                    eprintln!("Detailed report exported to: {}", detailed_path.display());
                }
            }
        }
        None => {
            let stdout = std::io::stdout();
            output::write_papers(stdout.lock(), classifier, &papers)?;
        }
    }

    print_summary(&report.summary);

    if report.papers.is_empty() {
        eprintln!("\nNo papers with industry authors found for query: {}", query);
        eprintln!("Try a different search query or check the filtering criteria.");
        return Ok(());
    }

    if let Some(path) = file {
        eprintln!("\nResults exported to: {}", path.display());
        print_preview(classifier, &papers);
    }

    info!(
        query = query,
        papers = report.summary.total_papers,
        with_industry = report.summary.papers_with_industry,
        "Search complete"
    );
    Ok(())
}

fn print_summary(summary: &SearchSummary) {
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("Total papers: {}", summary.total_papers);
    eprintln!("Papers with industry authors: {}", summary.papers_with_industry);
    eprintln!("Total industry authors: {}", summary.total_industry_authors);
    if let Some(avg) = summary.average_industry_authors() {
        eprintln!("Average industry authors per paper: {:.1}", avg);
    }
}

fn print_preview(classifier: &AffiliationClassifier, papers: &[Paper]) {
    let industry_papers = classifier.filter_papers_with_industry_authors(papers);

    eprintln!("\nPreview of Results:");
    eprintln!("{:<10} | {:<50} | {:<40} | Date", "PubMed ID", "Title", "Industry Authors");

    for paper in industry_papers.iter().take(PREVIEW_PAPERS) {
        let names: Vec<String> = classifier
            .identify_industry_authors(&paper.authors)
            .iter()
            .map(|a| a.display_name())
            .collect();
        let mut authors = names
            .iter()
            .take(PREVIEW_AUTHORS)
            .cloned()
            .collect::<Vec<_>>()
            .join("; ");
        if names.len() > PREVIEW_AUTHORS {
            authors.push_str("...");
        }

        eprintln!(
            "{:<10} | {:<50} | {:<40} | {}",
            paper.pubmed_id,
            shorten(&paper.title, PREVIEW_TITLE_CHARS),
            authors,
            paper.publication_date
        );
    }

    if industry_papers.len() > PREVIEW_PAPERS {
        eprintln!("... and {} more papers", industry_papers.len() - PREVIEW_PAPERS);
    }
}

fn shorten(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars - 3).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

async fn run_server(
    classifier: AffiliationClassifier,
    host: String,
    port: u16,
    email: Option<String>,
    api_key: Option<String>,
) -> Result<()> {
    info!(host = %host, port = port, "Starting HTTP server");

    let state = Arc::new(AppState::new(classifier, email, api_key));
    let app = server::router(state);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid host:port")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
