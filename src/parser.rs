//! PubMed efetch XML parsing.
//!
//! Walks `<PubmedArticleSet><PubmedArticle>` with a streaming reader and
//! produces [`Paper`] records. Only the fields the classifier and the
//! exports need are extracted.

use crate::error::{PubmedError, Result};
use crate::models::{Author, Paper};
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Generic email address pattern for affiliation text
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("Invalid email regex")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// Parse an efetch XML document into papers.
///
/// Articles without a PMID are skipped. Malformed XML is an error.
pub fn parse_papers(xml: &str) -> Result<Vec<Paper>> {
    // Text is not trimmed: whitespace around inline markup is significant
    let mut reader = Reader::from_str(xml);

    let mut papers = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut current: Option<ArticleBuilder> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            PubmedError::Parse(format!(
                "Error parsing XML at position {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(ref e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match name.as_str() {
                    "PubmedArticle" => current = Some(ArticleBuilder::default()),
                    "Author" if parent_is(&stack, "AuthorList") => {
                        if let Some(article) = current.as_mut() {
                            article.current_author = Some(AuthorBuilder::default());
                        }
                    }
                    _ => {}
                }
                stack.push(name);
            }
            Event::Text(ref e) => {
                let text = e
                    .unescape()
                    .map_err(|err| PubmedError::Parse(format!("Invalid text node: {}", err)))?;
                if let Some(article) = current.as_mut() {
                    article.on_text(&stack, &text);
                }
            }
            Event::End(ref e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                stack.pop();
                if let Some(article) = current.as_mut() {
                    article.on_end(&name, &stack);
                }
                if name == "PubmedArticle" {
                    if let Some(paper) = current.take().and_then(ArticleBuilder::finish) {
                        papers.push(paper);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    debug!(count = papers.len(), "Parsed PubMed articles");
    Ok(papers)
}

/// First email address found in free text.
pub fn extract_email(text: &str) -> Option<String> {
    EMAIL_PATTERN.find(text).map(|m| m.as_str().to_string())
}

/// Collapse runs of whitespace and trim.
pub fn clean_text(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// `YYYY-MM-DD` from year/month/day parts; `None` without a year.
///
/// Missing month or day become `01`; month names and abbreviations are
/// converted to numbers.
pub fn format_date(year: &str, month: &str, day: &str) -> Option<String> {
    let year = year.trim();
    if year.is_empty() {
        return None;
    }

    let month = month_number(month.trim()).unwrap_or_else(|| "01".to_string());
    let day = match day.trim() {
        d if !d.is_empty() && d.chars().all(|c| c.is_ascii_digit()) => format!("{:0>2}", d),
        _ => "01".to_string(),
    };

    Some(format!("{}-{}-{}", year, month, day))
}

fn month_number(month: &str) -> Option<String> {
    if month.is_empty() {
        return None;
    }
    if month.chars().all(|c| c.is_ascii_digit()) {
        return Some(format!("{:0>2}", month));
    }

    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let prefix: String = month.to_lowercase().chars().take(3).collect();
    MONTHS
        .iter()
        .position(|m| *m == prefix)
        .map(|idx| format!("{:02}", idx + 1))
}

fn parent_is(stack: &[String], name: &str) -> bool {
    stack.last().map(|s| s == name).unwrap_or(false)
}

fn within(stack: &[String], name: &str) -> bool {
    stack.iter().any(|s| s == name)
}

#[derive(Debug, Default)]
struct DateParts {
    year: String,
    month: String,
    day: String,
    medline: String,
}

impl DateParts {
    fn set(&mut self, field: &str, text: &str) {
        match field {
            "Year" => self.year = text.to_string(),
            "Month" => self.month = text.to_string(),
            "Day" => self.day = text.to_string(),
            "MedlineDate" => self.medline = text.to_string(),
            _ => {}
        }
    }

    /// Structured parts first, then a `MedlineDate` such as `2019 Jan-Feb`
    fn format(&self) -> Option<String> {
        if !self.year.is_empty() {
            return format_date(&self.year, &self.month, &self.day);
        }

        let mut tokens = self.medline.split_whitespace();
        let year = tokens.next().filter(|t| t.len() == 4 && t.chars().all(|c| c.is_ascii_digit()))?;
        let month = tokens
            .next()
            .map(|t| t.split('-').next().unwrap_or(t))
            .unwrap_or("");
        format_date(year, month, "")
    }
}

#[derive(Debug, Default)]
struct AuthorBuilder {
    last_name: String,
    first_name: String,
    initials: String,
    affiliation: String,
    affiliation_done: bool,
}

impl AuthorBuilder {
    fn build(self) -> Author {
        let affiliation = clean_text(&self.affiliation);
        let email = extract_email(&affiliation);
        Author {
            last_name: self.last_name,
            first_name: self.first_name,
            initials: self.initials,
            affiliation,
            email,
        }
    }
}

#[derive(Debug, Default)]
struct ArticleBuilder {
    pmid: String,
    title: String,
    journal: String,
    abstract_text: String,
    abstract_done: bool,
    pub_date: DateParts,
    article_date: DateParts,
    date_completed: DateParts,
    authors: Vec<Author>,
    current_author: Option<AuthorBuilder>,
}

impl ArticleBuilder {
    fn on_text(&mut self, stack: &[String], text: &str) {
        let Some(tag) = stack.last().map(String::as_str) else {
            return;
        };
        let parent = stack
            .len()
            .checked_sub(2)
            .and_then(|i| stack.get(i))
            .map(String::as_str)
            .unwrap_or("");

        // Title, abstract and affiliation keep every text node verbatim so
        // that inline markup joins up; `clean_text` normalizes them later.
        let value = text.trim();

        if let Some(author) = self.current_author.as_mut() {
            if within(stack, "Affiliation") {
                if !author.affiliation_done {
                    author.affiliation.push_str(text);
                }
                return;
            }
            match (tag, parent) {
                _ if value.is_empty() => {}
                ("LastName", "Author") | ("CollectiveName", "Author") => {
                    author.last_name = value.to_string()
                }
                ("ForeName", "Author") => author.first_name = value.to_string(),
                ("Initials", "Author") => author.initials = value.to_string(),
                _ => {}
            }
            return;
        }

        if within(stack, "ArticleTitle") {
            self.title.push_str(text);
        } else if within(stack, "AbstractText") {
            if !self.abstract_done {
                self.abstract_text.push_str(text);
            }
        } else if !value.is_empty() {
            self.set_field(tag, parent, value);
        }
    }

    fn set_field(&mut self, tag: &str, parent: &str, value: &str) {
        if tag == "PMID" && parent == "MedlineCitation" && self.pmid.is_empty() {
            self.pmid = value.to_string();
        } else if tag == "Title" && parent == "Journal" {
            self.journal = value.to_string();
        } else if parent == "PubDate" {
            self.pub_date.set(tag, value);
        } else if parent == "ArticleDate" {
            self.article_date.set(tag, value);
        } else if parent == "DateCompleted" {
            self.date_completed.set(tag, value);
        }
    }

    fn on_end(&mut self, name: &str, stack: &[String]) {
        match name {
            "AbstractText" => self.abstract_done = true,
            "Affiliation" => {
                if let Some(author) = self.current_author.as_mut() {
                    author.affiliation_done = true;
                }
            }
            "Author" if parent_is(stack, "AuthorList") => {
                if let Some(author) = self.current_author.take() {
                    self.authors.push(author.build());
                }
            }
            _ => {}
        }
    }

    fn finish(self) -> Option<Paper> {
        if self.pmid.is_empty() {
            warn!("Skipping PubMed article without PMID");
            return None;
        }

        let publication_date = self
            .pub_date
            .format()
            .or_else(|| self.article_date.format())
            .or_else(|| self.date_completed.format())
            .unwrap_or_default();

        Some(Paper {
            pubmed_id: self.pmid,
            title: clean_text(&self.title),
            publication_date,
            journal: clean_text(&self.journal),
            abstract_text: clean_text(&self.abstract_text),
            authors: self.authors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation>
      <PMID Version="1">38000001</PMID>
      <DateCompleted><Year>2024</Year><Month>02</Month><Day>10</Day></DateCompleted>
      <Article>
        <Journal>
          <JournalIssue>
            <PubDate><Year>2023</Year><Month>Dec</Month><Day>5</Day></PubDate>
          </JournalIssue>
          <Title>Journal of   Clinical Oncology</Title>
        </Journal>
        <ArticleTitle>Effect of <i>KRAS</i> inhibitors on tumour growth</ArticleTitle>
        <Abstract>
          <AbstractText Label="BACKGROUND">First   part.</AbstractText>
          <AbstractText Label="METHODS">Second part.</AbstractText>
        </Abstract>
        <AuthorList>
          <Author>
            <LastName>Johnson</LastName>
            <ForeName>Jane</ForeName>
            <Initials>J</Initials>
            <AffiliationInfo>
              <Affiliation>Pfizer Inc., Groton, CT, USA. jane.johnson@pfizer.com.</Affiliation>
            </AffiliationInfo>
            <AffiliationInfo>
              <Affiliation>Second affiliation, ignored.</Affiliation>
            </AffiliationInfo>
          </Author>
          <Author>
            <LastName>Smith</LastName>
            <Initials>JS</Initials>
          </Author>
          <Author>
            <CollectiveName>KRAS Study Group</CollectiveName>
          </Author>
        </AuthorList>
      </Article>
      <CommentsCorrectionsList>
        <CommentsCorrections><PMID>11111111</PMID></CommentsCorrections>
      </CommentsCorrectionsList>
    </MedlineCitation>
  </PubmedArticle>
  <PubmedArticle>
    <MedlineCitation>
      <Article><ArticleTitle>No identifier</ArticleTitle></Article>
    </MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>"#;

    #[test]
    fn test_parse_empty_set() {
        let papers = parse_papers("<PubmedArticleSet></PubmedArticleSet>").expect("Parse failed");
        assert!(papers.is_empty());
    }

    #[test]
    fn test_parse_sample_article() {
        let papers = parse_papers(SAMPLE).expect("Parse failed");
        assert_eq!(papers.len(), 1);

        let paper = &papers[0];
        assert_eq!(paper.pubmed_id, "38000001");
        assert_eq!(paper.title, "Effect of KRAS inhibitors on tumour growth");
        assert_eq!(paper.journal, "Journal of Clinical Oncology");
        assert_eq!(paper.abstract_text, "First part.");
        assert_eq!(paper.publication_date, "2023-12-05");
        assert_eq!(paper.authors.len(), 3);
    }

    #[test]
    fn test_parse_authors() {
        let papers = parse_papers(SAMPLE).expect("Parse failed");
        let authors = &papers[0].authors;

        assert_eq!(authors[0].last_name, "Johnson");
        assert_eq!(authors[0].first_name, "Jane");
        assert_eq!(
            authors[0].affiliation,
            "Pfizer Inc., Groton, CT, USA. jane.johnson@pfizer.com."
        );
        assert_eq!(authors[0].email.as_deref(), Some("jane.johnson@pfizer.com"));

        assert_eq!(authors[1].display_name(), "Smith, JS");
        assert_eq!(authors[1].affiliation, "");
        assert_eq!(authors[1].email, None);

        assert_eq!(authors[2].last_name, "KRAS Study Group");
        assert_eq!(
            papers[0].corresponding_author_email(),
            Some("jane.johnson@pfizer.com")
        );
    }

    #[test]
    fn test_inline_markup_is_joined_without_spaces() {
        let xml = r#"<PubmedArticleSet><PubmedArticle><MedlineCitation>
            <PMID>42</PMID>
            <Article>
              <ArticleTitle>CD4<sup>+</sup> T cells in <i>KRAS</i>-mutant H<sub>2</sub>O models</ArticleTitle>
              <Abstract>
                <AbstractText>Levels of <b>IL-6</b>, TNF-<i>alpha</i> &amp;
                  CO<sub>2</sub> rose.</AbstractText>
              </Abstract>
              <AuthorList>
                <Author>
                  <LastName>Chen</LastName>
                  <AffiliationInfo>
                    <Affiliation>R&amp;D, <i>Acme</i> Biologics Inc.</Affiliation>
                  </AffiliationInfo>
                </Author>
              </AuthorList>
            </Article>
        </MedlineCitation></PubmedArticle></PubmedArticleSet>"#;

        let papers = parse_papers(xml).expect("Parse failed");
        let paper = &papers[0];
        assert_eq!(paper.title, "CD4+ T cells in KRAS-mutant H2O models");
        assert_eq!(paper.abstract_text, "Levels of IL-6, TNF-alpha & CO2 rose.");
        assert_eq!(paper.authors[0].last_name, "Chen");
        assert_eq!(paper.authors[0].affiliation, "R&D, Acme Biologics Inc.");
    }

    #[test]
    fn test_malformed_xml_is_error() {
        let result = parse_papers("<PubmedArticleSet><PubmedArticle></Wrong></PubmedArticleSet>");
        assert!(matches!(result, Err(PubmedError::Parse(_))));
    }

    #[test]
    fn test_date_fallbacks() {
        let xml = r#"<PubmedArticleSet><PubmedArticle><MedlineCitation>
            <PMID>1</PMID>
            <Article><Journal><JournalIssue><PubDate><MedlineDate>2019 Jan-Feb</MedlineDate></PubDate></JournalIssue></Journal></Article>
        </MedlineCitation></PubmedArticle>
        <PubmedArticle><MedlineCitation>
            <PMID>2</PMID>
            <Article><ArticleDate DateType="Electronic"><Year>2021</Year><Month>7</Month><Day>3</Day></ArticleDate></Article>
        </MedlineCitation></PubmedArticle>
        <PubmedArticle><MedlineCitation><PMID>3</PMID></MedlineCitation></PubmedArticle>
        </PubmedArticleSet>"#;

        let papers = parse_papers(xml).expect("Parse failed");
        assert_eq!(papers[0].publication_date, "2019-01-01");
        assert_eq!(papers[1].publication_date, "2021-07-03");
        assert_eq!(papers[2].publication_date, "");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2024", "Mar", "9").as_deref(), Some("2024-03-09"));
        assert_eq!(format_date("2024", "", "").as_deref(), Some("2024-01-01"));
        assert_eq!(format_date("2024", "september", "30").as_deref(), Some("2024-09-30"));
        assert_eq!(format_date("2024", "Spring", "").as_deref(), Some("2024-01-01"));
        assert_eq!(format_date("", "Jan", "1"), None);
    }

    #[test]
    fn test_extract_email() {
        assert_eq!(
            extract_email("Dept X, Boston. Electronic address: a.b@mgh.harvard.edu.").as_deref(),
            Some("a.b@mgh.harvard.edu")
        );
        assert_eq!(extract_email("No address here"), None);
        assert_eq!(extract_email(""), None);
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  a \n\t b  "), "a b");
    }
}
