//! # rustpubmed
//!
//! PubMed Industry-Affiliation Finder - Rust Microservice
//!
//! Searches PubMed and keeps the papers that have at least one author
//! affiliated with a pharmaceutical or biotech company.
//!
//! ## Modules
//!
//! - [`classifier`] - Weighted industry/academic author classification
//! - [`scoring`] - Email-domain and affiliation-text scorers
//! - [`lexicon`] - Keyword and company tables
//! - [`company`] - Organization name extraction
//! - [`pubmed`] - E-utilities client
//! - [`parser`] - PubMed XML parsing
//! - [`report`] / [`output`] - Result aggregation and CSV export
//! - [`server`] - HTTP job API
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rustpubmed::{classifier::AffiliationClassifier, pubmed::PubMedClient, report};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = PubMedClient::new(None, None)?;
//!     let ids = client.search("cancer immunotherapy", 20).await?;
//!     let papers = client.fetch_papers(&ids).await?;
//!     let report = report::build_report(&AffiliationClassifier::default(), "cancer immunotherapy", &papers);
//!     println!("{} papers with industry authors", report.summary.papers_with_industry);
//!     Ok(())
//! }
//! ```

pub mod classifier;
pub mod company;
pub mod config;
pub mod error;
pub mod lexicon;
pub mod models;
pub mod output;
pub mod parser;
pub mod pubmed;
pub mod report;
pub mod scoring;
pub mod server;

pub use error::{PubmedError, Result};
