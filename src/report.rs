//! Paper-level and query-level summaries of classification results.
//!
//! These are the shapes handed to the CSV export, the console preview and
//! the JSON status endpoint.

use crate::classifier::AffiliationClassifier;
use crate::models::{Author, Paper};
use chrono::Local;
use serde::{Deserialize, Serialize};

/// An industry-classified author as reported to users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndustryAuthor {
    pub name: String,
    pub affiliation: String,
    pub email: Option<String>,
}

impl From<&Author> for IndustryAuthor {
    fn from(author: &Author) -> Self {
        Self {
            name: author.display_name(),
            affiliation: author.affiliation.clone(),
            email: author.email.clone(),
        }
    }
}

/// One paper with at least one industry author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperReport {
    pub pubmed_id: String,
    pub title: String,
    pub publication_date: String,
    pub journal: String,
    pub industry_authors: Vec<IndustryAuthor>,
    /// Sorted, deduplicated organization names
    pub companies: Vec<String>,
    pub corresponding_email: Option<String>,
    pub total_authors: usize,
    pub industry_authors_count: usize,
}

impl PaperReport {
    /// Report for `paper`, or `None` when it has no industry author.
    pub fn build(classifier: &AffiliationClassifier, paper: &Paper) -> Option<Self> {
        let industry = classifier.identify_industry_authors(&paper.authors);
        if industry.is_empty() {
            return None;
        }

        let companies = classifier
            .get_company_affiliations(industry.iter().copied())
            .into_iter()
            .collect();

        Some(Self {
            pubmed_id: paper.pubmed_id.clone(),
            title: paper.title.clone(),
            publication_date: paper.publication_date.clone(),
            journal: paper.journal.clone(),
            industry_authors: industry.iter().map(|a| IndustryAuthor::from(*a)).collect(),
            companies,
            corresponding_email: paper.corresponding_author_email().map(String::from),
            total_authors: paper.authors.len(),
            industry_authors_count: industry.len(),
        })
    }
}

/// Counts over all papers of one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSummary {
    pub total_papers: usize,
    pub papers_with_industry: usize,
    pub total_industry_authors: usize,
    pub query: String,
    pub timestamp: String,
}

impl SearchSummary {
    /// Mean industry authors per paper that has any, `None` when there are none.
    pub fn average_industry_authors(&self) -> Option<f64> {
        if self.papers_with_industry == 0 {
            None
        } else {
            Some(self.total_industry_authors as f64 / self.papers_with_industry as f64)
        }
    }
}

/// Full result of one search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchReport {
    pub papers: Vec<PaperReport>,
    pub summary: SearchSummary,
}

impl SearchReport {
    /// Report with no papers, used when the query matched nothing.
    pub fn empty(query: &str) -> Self {
        build_report(&AffiliationClassifier::default(), query, &[])
    }
}

/// Classify every paper and fold the results into a report.
pub fn build_report(classifier: &AffiliationClassifier, query: &str, papers: &[Paper]) -> SearchReport {
    let reports: Vec<PaperReport> = papers
        .iter()
        .filter_map(|paper| PaperReport::build(classifier, paper))
        .collect();

    let summary = SearchSummary {
        total_papers: papers.len(),
        papers_with_industry: reports.len(),
        total_industry_authors: reports.iter().map(|r| r.industry_authors_count).sum(),
        query: query.to_string(),
        timestamp: Local::now().to_rfc3339(),
    };

    SearchReport {
        papers: reports,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn papers() -> Vec<Paper> {
        vec![
            Paper {
                pubmed_id: "1".to_string(),
                title: "Academic only".to_string(),
                authors: vec![Author::new("Doe", "John", "J", "Harvard University")
                    .with_email("john@harvard.edu")],
                ..Default::default()
            },
            Paper {
                pubmed_id: "2".to_string(),
                title: "Mixed".to_string(),
                authors: vec![
                    Author::new("Doe", "John", "J", "Harvard University").with_email("john@harvard.edu"),
                    Author::new("Johnson", "Jane", "J", "Pfizer Inc., New York")
                        .with_email("jane@pfizer.com"),
                    Author::new("Park", "", "SK", "Pfizer Inc., Groton").with_email("park@pfizer.com"),
                    Author::new("Weber", "Anna", "A", "Bayer AG, Leverkusen"),
                ],
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_build_report_counts() {
        let report = build_report(&AffiliationClassifier::default(), "oncology", &papers());

        assert_eq!(report.summary.total_papers, 2);
        assert_eq!(report.summary.papers_with_industry, 1);
        assert_eq!(report.summary.total_industry_authors, 3);
        assert_eq!(report.summary.query, "oncology");
        assert_eq!(report.summary.average_industry_authors(), Some(3.0));
    }

    #[test]
    fn test_paper_report_fields() {
        let report = build_report(&AffiliationClassifier::default(), "q", &papers());
        let paper = &report.papers[0];

        assert_eq!(paper.pubmed_id, "2");
        assert_eq!(paper.total_authors, 4);
        assert_eq!(paper.industry_authors_count, 3);
        assert_eq!(paper.companies, vec!["Bayer AG", "Pfizer Inc."]);
        assert_eq!(paper.industry_authors[0].name, "Johnson, Jane");
        assert_eq!(paper.industry_authors[1].name, "Park, SK");
        // first listed email, even though that author is academic
        assert_eq!(paper.corresponding_email.as_deref(), Some("john@harvard.edu"));
    }

    #[test]
    fn test_empty_report() {
        let report = SearchReport::empty("nothing");
        assert!(report.papers.is_empty());
        assert_eq!(report.summary.total_papers, 0);
        assert_eq!(report.summary.average_industry_authors(), None);
    }
}
