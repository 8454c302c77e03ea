//! Normalized bibliographic records.
//!
//! Produced by [`crate::parser`] from PubMed XML; consumed by the classifier,
//! the company extractor and the report builders.

use serde::{Deserialize, Serialize};

/// A listed author of a paper.
///
/// Empty strings stand for missing values, an empty affiliation is "unknown".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub last_name: String,
    pub first_name: String,
    pub initials: String,
    pub affiliation: String,
    pub email: Option<String>,
}

impl Author {
    pub fn new(last_name: &str, first_name: &str, initials: &str, affiliation: &str) -> Self {
        Self {
            last_name: last_name.to_string(),
            first_name: first_name.to_string(),
            initials: initials.to_string(),
            affiliation: affiliation.to_string(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    /// Email address, or `""` when absent
    pub fn email_str(&self) -> &str {
        self.email.as_deref().unwrap_or("")
    }

    /// `Last, First`, falling back to `Last, Initials` and then `Last`
    pub fn display_name(&self) -> String {
        if !self.first_name.is_empty() {
            format!("{}, {}", self.last_name, self.first_name)
        } else if !self.initials.is_empty() {
            format!("{}, {}", self.last_name, self.initials)
        } else {
            self.last_name.clone()
        }
    }
}

/// A PubMed record with its ordered author list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub pubmed_id: String,
    pub title: String,
    /// `YYYY-MM-DD`, empty when the record has no usable date
    pub publication_date: String,
    pub journal: String,
    pub abstract_text: String,
    pub authors: Vec<Author>,
}

impl Paper {
    /// First non-empty author email in listed order
    pub fn corresponding_author_email(&self) -> Option<&str> {
        self.authors
            .iter()
            .filter_map(|a| a.email.as_deref())
            .find(|e| !e.is_empty())
    }
}
