//! Industry vs. academic author classification.
//!
//! The combined score is `email_weight * email + affiliation_weight * text`
//! and an author is industry-affiliated when it is strictly above the
//! threshold. Classification is a pure function of the author's affiliation
//! and email, so a classifier can be shared freely across threads.

use crate::company::extract_company_name;
use crate::config::ScoringConfig;
use crate::error::Result;
use crate::lexicon::Lexicon;
use crate::models::{Author, Paper};
use crate::scoring::{AffiliationScorer, EmailScorer, EmailSignal};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

/// Scores behind one classification decision. Not cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub email_score: f64,
    /// Email rule that fired
    pub email_signal: EmailSignal,
    pub affiliation_score: f64,
    /// Affiliation decision rule that fired
    pub affiliation_rule: &'static str,
    pub total_score: f64,
    pub is_industry: bool,
}

/// Heuristic industry-affiliation classifier.
#[derive(Debug, Clone)]
pub struct AffiliationClassifier {
    email_scorer: EmailScorer,
    affiliation_scorer: AffiliationScorer,
    email_weight: f64,
    affiliation_weight: f64,
    threshold: f64,
}

impl AffiliationClassifier {
    /// Build a classifier from a validated config.
    pub fn new(config: &ScoringConfig) -> Result<Self> {
        config.validate()?;
        let lexicon = Lexicon::with_extra_companies(&config.extra_known_companies);
        Ok(Self::with_lexicon(config, &lexicon))
    }

    /// Build from explicit tables; the config is taken as-is.
    pub fn with_lexicon(config: &ScoringConfig, lexicon: &Lexicon) -> Self {
        Self {
            email_scorer: EmailScorer::new(lexicon, &config.suffix_rules),
            affiliation_scorer: AffiliationScorer::new(lexicon),
            email_weight: config.email_weight,
            affiliation_weight: config.affiliation_weight,
            threshold: config.threshold,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn affiliation_scorer(&self) -> &AffiliationScorer {
        &self.affiliation_scorer
    }

    /// Score an author and apply the threshold.
    pub fn classify(&self, author: &Author) -> Classification {
        let email = self.email_scorer.evaluate(author.email_str());
        let affiliation = self.affiliation_scorer.evaluate(&author.affiliation);
        let email_score = email.score;
        let affiliation_score = affiliation.score;
        let total_score =
            self.email_weight * email_score + self.affiliation_weight * affiliation_score;
        let is_industry = total_score > self.threshold;

        debug!(
            author = %author.display_name(),
            email = author.email_str(),
            email_signal = ?email.signal,
            email_score,
            affiliation_rule = affiliation.rule,
            academic_hits = affiliation.counts.academic,
            industry_hits = affiliation.counts.industry,
            affiliation_score,
            total_score,
            is_industry,
            "Scored author"
        );

        Classification {
            email_score,
            email_signal: email.signal,
            affiliation_score,
            affiliation_rule: affiliation.rule,
            total_score,
            is_industry,
        }
    }

    pub fn is_industry_affiliation(&self, author: &Author) -> bool {
        self.classify(author).is_industry
    }

    /// Industry-affiliated authors in input order.
    pub fn identify_industry_authors<'a>(&self, authors: &'a [Author]) -> Vec<&'a Author> {
        authors
            .iter()
            .filter(|a| self.is_industry_affiliation(a))
            .collect()
    }

    /// Papers with at least one industry author, in input order.
    ///
    /// Papers keep their full author list.
    pub fn filter_papers_with_industry_authors<'a>(&self, papers: &'a [Paper]) -> Vec<&'a Paper> {
        papers
            .iter()
            .filter(|paper| {
                let industry = self.identify_industry_authors(&paper.authors);
                if !industry.is_empty() {
                    debug!(
                        pubmed_id = %paper.pubmed_id,
                        industry_authors = industry.len(),
                        "Paper has industry authors"
                    );
                }
                !industry.is_empty()
            })
            .collect()
    }

    /// Distinct organization names of the industry authors in `authors`.
    ///
    /// Authors without an affiliation and empty extractions are skipped.
    pub fn get_company_affiliations<'a, I>(&self, authors: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a Author>,
    {
        authors
            .into_iter()
            .filter(|a| !a.affiliation.trim().is_empty())
            .filter(|a| self.is_industry_affiliation(a))
            .map(|a| extract_company_name(&a.affiliation))
            .filter(|name| !name.is_empty())
            .collect()
    }
}

impl Default for AffiliationClassifier {
    fn default() -> Self {
        Self::with_lexicon(&ScoringConfig::default(), &Lexicon::default())
    }
}
