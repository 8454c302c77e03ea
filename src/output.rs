//! CSV export of industry-affiliated papers.
//!
//! Two layouts: one summary row per paper, and a detailed report with one
//! row per industry author. Papers without an industry author are omitted.

use crate::classifier::AffiliationClassifier;
use crate::error::Result;
use crate::models::Paper;
use crate::report::PaperReport;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Abstracts longer than this are truncated in the detailed report
const ABSTRACT_PREVIEW_CHARS: usize = 500;

/// Separator for multi-valued cells
const LIST_SEPARATOR: &str = "; ";

/// Summary CSV row
#[derive(Debug, Serialize)]
pub struct PaperRow {
    #[serde(rename = "PubmedID")]
    pub pubmed_id: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Publication Date")]
    pub publication_date: String,
    #[serde(rename = "Non-academic Author(s)")]
    pub non_academic_authors: String,
    #[serde(rename = "Company Affiliation(s)")]
    pub company_affiliations: String,
    #[serde(rename = "Corresponding Author Email")]
    pub corresponding_author_email: String,
    #[serde(rename = "Journal")]
    pub journal: String,
    #[serde(rename = "Total Authors")]
    pub total_authors: usize,
    #[serde(rename = "Industry Authors Count")]
    pub industry_authors_count: usize,
}

impl From<&PaperReport> for PaperRow {
    fn from(report: &PaperReport) -> Self {
        Self {
            pubmed_id: report.pubmed_id.clone(),
            title: report.title.clone(),
            publication_date: report.publication_date.clone(),
            non_academic_authors: report
                .industry_authors
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(LIST_SEPARATOR),
            company_affiliations: report.companies.join(LIST_SEPARATOR),
            corresponding_author_email: report.corresponding_email.clone().unwrap_or_default(),
            journal: report.journal.clone(),
            total_authors: report.total_authors,
            industry_authors_count: report.industry_authors_count,
        }
    }
}

/// Detailed CSV row, one per industry author
#[derive(Debug, Serialize)]
pub struct AuthorRow {
    #[serde(rename = "PubmedID")]
    pub pubmed_id: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Publication Date")]
    pub publication_date: String,
    #[serde(rename = "Journal")]
    pub journal: String,
    #[serde(rename = "Author Last Name")]
    pub last_name: String,
    #[serde(rename = "Author First Name")]
    pub first_name: String,
    #[serde(rename = "Author Initials")]
    pub initials: String,
    #[serde(rename = "Author Email")]
    pub email: String,
    #[serde(rename = "Author Affiliation")]
    pub affiliation: String,
    #[serde(rename = "Corresponding Author Email")]
    pub corresponding_author_email: String,
    #[serde(rename = "Abstract")]
    pub abstract_text: String,
}

/// Summary rows for the papers that have industry authors.
pub fn paper_rows(classifier: &AffiliationClassifier, papers: &[Paper]) -> Vec<PaperRow> {
    papers
        .iter()
        .filter_map(|paper| PaperReport::build(classifier, paper))
        .map(|report| PaperRow::from(&report))
        .collect()
}

/// Detailed rows, one per industry author.
pub fn author_rows(classifier: &AffiliationClassifier, papers: &[Paper]) -> Vec<AuthorRow> {
    let mut rows = Vec::new();

    for paper in papers {
        let corresponding = paper.corresponding_author_email().unwrap_or_default();
        for author in classifier.identify_industry_authors(&paper.authors) {
            rows.push(AuthorRow {
                pubmed_id: paper.pubmed_id.clone(),
                title: paper.title.clone(),
                publication_date: paper.publication_date.clone(),
                journal: paper.journal.clone(),
                last_name: author.last_name.clone(),
                first_name: author.first_name.clone(),
                initials: author.initials.clone(),
                email: author.email_str().to_string(),
                affiliation: author.affiliation.clone(),
                corresponding_author_email: corresponding.to_string(),
                abstract_text: truncate_abstract(&paper.abstract_text),
            });
        }
    }

    rows
}

/// Write serializable rows with a header line.
pub fn write_rows<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(true).from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write summary rows for reports that were already built.
pub fn write_reports<W: Write>(writer: W, reports: &[PaperReport]) -> Result<()> {
    let rows: Vec<PaperRow> = reports.iter().map(PaperRow::from).collect();
    write_rows(writer, &rows)
}

/// Write the summary CSV to any writer (stdout, HTTP body, file).
///
/// Returns the number of rows written.
pub fn write_papers<W: Write>(
    writer: W,
    classifier: &AffiliationClassifier,
    papers: &[Paper],
) -> Result<usize> {
    let rows = paper_rows(classifier, papers);
    write_rows(writer, &rows)?;
    Ok(rows.len())
}

/// Export the summary CSV to `path`, creating parent directories.
///
/// Nothing is written when no paper has an industry author.
pub fn export_papers(path: &Path, classifier: &AffiliationClassifier, papers: &[Paper]) -> Result<usize> {
    let rows = paper_rows(classifier, papers);
    if rows.is_empty() {
        info!(path = %path.display(), "No papers with industry authors, nothing exported");
        return Ok(0);
    }

    create_parent_dir(path)?;
    let file = std::fs::File::create(path)?;
    write_rows(file, &rows)?;
    info!(path = %path.display(), rows = rows.len(), "Exported papers");
    Ok(rows.len())
}

/// Export the detailed report next to `path` as `<stem>_detailed.csv`.
///
/// Returns the report path when something was written.
pub fn export_detailed_report(
    path: &Path,
    classifier: &AffiliationClassifier,
    papers: &[Paper],
) -> Result<Option<PathBuf>> {
    let rows = author_rows(classifier, papers);
    if rows.is_empty() {
        info!("No detailed data to export");
        return Ok(None);
    }

    let detailed = detailed_path(path);
    create_parent_dir(&detailed)?;
    let file = std::fs::File::create(&detailed)?;
    write_rows(file, &rows)?;
    info!(path = %detailed.display(), rows = rows.len(), "Exported detailed report");
    Ok(Some(detailed))
}

/// `results.csv` -> `results_detailed.csv`
pub fn detailed_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "results".to_string());
    path.with_file_name(format!("{}_detailed.csv", stem))
}

fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn truncate_abstract(text: &str) -> String {
    if text.chars().count() > ABSTRACT_PREVIEW_CHARS {
        let head: String = text.chars().take(ABSTRACT_PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Author;
    use tempfile::TempDir;

    fn sample() -> Vec<Paper> {
        vec![
            Paper {
                pubmed_id: "12345".to_string(),
                title: "Test Paper".to_string(),
                publication_date: "2024-01-01".to_string(),
                journal: "Test Journal".to_string(),
                abstract_text: "x".repeat(600),
                authors: vec![
                    Author::new("Smith", "John", "J", "Harvard University").with_email("john@harvard.edu"),
                    Author::new("Johnson", "Jane", "J", "Pfizer Inc.").with_email("jane@pfizer.com"),
                    Author::new("Doe", "", "J.D.", "Genentech Inc., South San Francisco"),
                ],
            },
            Paper {
                pubmed_id: "67890".to_string(),
                title: "Academic".to_string(),
                authors: vec![Author::new("Li", "Wei", "W", "Peking University").with_email("li@pku.edu.cn")],
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_write_papers_header_and_rows() -> Result<()> {
        let mut buf = Vec::new();
        let count = write_papers(&mut buf, &AffiliationClassifier::default(), &sample())?;
        assert_eq!(count, 1);

        let text = String::from_utf8(buf).expect("utf8");
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some(
                "PubmedID,Title,Publication Date,Non-academic Author(s),Company Affiliation(s),\
                 Corresponding Author Email,Journal,Total Authors,Industry Authors Count"
            )
        );
        let row = lines.next().expect("row");
        assert!(row.starts_with("12345,Test Paper,2024-01-01,"));
        assert!(row.contains("\"Johnson, Jane; Doe, J.D.\""));
        assert!(row.contains("Genentech Inc.; Pfizer Inc."));
        assert!(row.ends_with("john@harvard.edu,Test Journal,3,2"));
        assert_eq!(lines.next(), None);
        Ok(())
    }

    #[test]
    fn test_export_papers_creates_file() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested").join("results.csv");

        let count = export_papers(&path, &AffiliationClassifier::default(), &sample())?;
        assert_eq!(count, 1);
        assert!(path.exists());
        Ok(())
    }

    #[test]
    fn test_export_papers_skips_academic_only() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("results.csv");
        let academic = &sample()[1..];

        assert_eq!(export_papers(&path, &AffiliationClassifier::default(), academic)?, 0);
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn test_detailed_report() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("results.csv");

        let written = export_detailed_report(&path, &AffiliationClassifier::default(), &sample())?
            .expect("report written");
        assert_eq!(written, dir.path().join("results_detailed.csv"));

        let rows = author_rows(&AffiliationClassifier::default(), &sample());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].last_name, "Johnson");
        assert_eq!(rows[1].email, "");
        assert_eq!(rows[0].abstract_text.chars().count(), ABSTRACT_PREVIEW_CHARS + 3);
        Ok(())
    }

    #[test]
    fn test_write_reports_matches_write_papers() -> Result<()> {
        let classifier = AffiliationClassifier::default();
        let report = crate::report::build_report(&classifier, "q", &sample());

        let mut from_reports = Vec::new();
        write_reports(&mut from_reports, &report.papers)?;
        let mut from_papers = Vec::new();
        write_papers(&mut from_papers, &classifier, &sample())?;

        assert_eq!(from_reports, from_papers);
        Ok(())
    }

    #[test]
    fn test_detailed_path() {
        assert_eq!(
            detailed_path(Path::new("out/results.csv")),
            PathBuf::from("out/results_detailed.csv")
        );
    }
}
