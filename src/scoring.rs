//! Email domain and affiliation text scorers.
//!
//! Both scorers map their input to a signed score in [-1, 1]: negative leans
//! academic, positive leans industry. Every input has a score; empty input is
//! neutral and unrecognized input falls through to the last rule of each table.

use crate::config::{SuffixRule, ACADEMIC_MARKER_SCORE, ACADEMIC_SUFFIX_SCORE};
use crate::lexicon::Lexicon;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Domain ending in `.edu`, `.ac.<tld>` or `.edu.<tld>`
static ACADEMIC_EMAIL_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)@[^@\s]*\.(edu|ac\.[a-z]{2,}|edu\.[a-z]{2,})$")
        .expect("Invalid academic email regex")
});

/// Whole-word legal entity suffix
static LEGAL_ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(inc|ltd|llc|corp|gmbh)\b").expect("Invalid legal entity regex")
});

/// Whole-word academic institution noun
static ACADEMIC_INSTITUTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(university|college|institute)\b").expect("Invalid institution regex")
});

/// Bonus added to a keyword count by a whole-word pattern hit
const PATTERN_BOOST: usize = 2;

/// Weight of each distinct known-company hit
const KNOWN_COMPANY_WEIGHT: usize = 2;

// ============================================================================
// Email
// ============================================================================

/// Which email rule produced the score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EmailSignal {
    /// No address
    Empty,
    /// Domain ends in an academic suffix
    AcademicSuffix,
    /// Academic marker found somewhere in the address
    AcademicMarker(String),
    /// Matched a configured suffix rule
    Suffix(String),
    /// Nothing matched
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailScore {
    pub score: f64,
    pub signal: EmailSignal,
}

/// Scores an email address by its domain.
#[derive(Debug, Clone)]
pub struct EmailScorer {
    markers: Vec<String>,
    suffix_rules: Vec<SuffixRule>,
}

impl EmailScorer {
    pub fn new(lexicon: &Lexicon, suffix_rules: &[SuffixRule]) -> Self {
        Self {
            markers: lexicon.academic_domain_markers.clone(),
            suffix_rules: suffix_rules
                .iter()
                .map(|r| SuffixRule::new(&r.suffix, r.score))
                .collect(),
        }
    }

    pub fn score(&self, email: &str) -> f64 {
        self.evaluate(email).score
    }

    /// Score an address and report the rule that fired.
    ///
    /// An exact academic suffix outranks a bare marker hit, so the suffix
    /// regex is consulted before the marker scan.
    pub fn evaluate(&self, email: &str) -> EmailScore {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return EmailScore {
                score: 0.0,
                signal: EmailSignal::Empty,
            };
        }

        if ACADEMIC_EMAIL_SUFFIX.is_match(&email) {
            return EmailScore {
                score: ACADEMIC_SUFFIX_SCORE,
                signal: EmailSignal::AcademicSuffix,
            };
        }

        if let Some(marker) = self.markers.iter().find(|m| email.contains(m.as_str())) {
            return EmailScore {
                score: ACADEMIC_MARKER_SCORE,
                signal: EmailSignal::AcademicMarker(marker.clone()),
            };
        }

        self.suffix_rules
            .iter()
            .find(|rule| email.ends_with(rule.suffix.as_str()))
            .map(|rule| EmailScore {
                score: rule.score,
                signal: EmailSignal::Suffix(rule.suffix.clone()),
            })
            .unwrap_or(EmailScore {
                score: 0.0,
                signal: EmailSignal::Unrecognized,
            })
    }
}

// ============================================================================
// Affiliation text
// ============================================================================

/// Evidence tallies for one affiliation string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeywordCounts {
    pub academic: usize,
    pub industry: usize,
    /// Distinct known-company hits (already folded into `industry`)
    pub known_companies: usize,
}

/// One row of the affiliation decision table.
#[derive(Debug, Clone, Copy)]
pub struct AffiliationRule {
    pub name: &'static str,
    pub applies: fn(KeywordCounts) -> bool,
    pub score: f64,
}

fn only_academic(c: KeywordCounts) -> bool {
    c.academic > 0 && c.industry == 0
}

fn only_industry(c: KeywordCounts) -> bool {
    c.industry > 0 && c.academic == 0
}

fn mostly_industry(c: KeywordCounts) -> bool {
    c.industry > c.academic
}

fn mostly_academic(c: KeywordCounts) -> bool {
    c.academic > c.industry
}

fn tie(_: KeywordCounts) -> bool {
    true
}

/// Ordered decision table, first match wins.
///
/// Ties (including no evidence at all) lean slightly towards industry.
pub const AFFILIATION_RULES: &[AffiliationRule] = &[
    AffiliationRule {
        name: "academic_only",
        applies: only_academic,
        score: -0.7,
    },
    AffiliationRule {
        name: "industry_only",
        applies: only_industry,
        score: 0.8,
    },
    AffiliationRule {
        name: "industry_majority",
        applies: mostly_industry,
        score: 0.6,
    },
    AffiliationRule {
        name: "academic_majority",
        applies: mostly_academic,
        score: -0.4,
    },
    AffiliationRule {
        name: "tie",
        applies: tie,
        score: 0.1,
    },
];

#[derive(Debug, Clone, PartialEq)]
pub struct AffiliationScore {
    pub score: f64,
    pub counts: KeywordCounts,
    /// Name of the decision rule, `"empty"` for blank input
    pub rule: &'static str,
}

/// Scores free-text affiliations by keyword evidence.
#[derive(Debug, Clone)]
pub struct AffiliationScorer {
    academic_keywords: Vec<String>,
    industry_keywords: Vec<String>,
    known_companies: Vec<String>,
}

impl AffiliationScorer {
    pub fn new(lexicon: &Lexicon) -> Self {
        Self {
            academic_keywords: lexicon.academic_keywords.clone(),
            industry_keywords: lexicon.industry_keywords.clone(),
            known_companies: lexicon.known_companies.clone(),
        }
    }

    pub fn score(&self, affiliation: &str) -> f64 {
        self.evaluate(affiliation).score
    }

    pub fn evaluate(&self, affiliation: &str) -> AffiliationScore {
        let text = affiliation.trim().to_lowercase();
        if text.is_empty() {
            return AffiliationScore {
                score: 0.0,
                counts: KeywordCounts::default(),
                rule: "empty",
            };
        }

        let counts = self.count_lowercase(&text);
        let rule = decide(&counts);
        AffiliationScore {
            score: rule.score,
            counts,
            rule: rule.name,
        }
    }

    /// Tally keyword evidence in an affiliation string.
    pub fn count(&self, affiliation: &str) -> KeywordCounts {
        self.count_lowercase(&affiliation.to_lowercase())
    }

    fn count_lowercase(&self, text: &str) -> KeywordCounts {
        let mut academic = count_present(&self.academic_keywords, text);
        let mut industry = count_present(&self.industry_keywords, text);

        if LEGAL_ENTITY.is_match(text) {
            industry += PATTERN_BOOST;
        }
        if ACADEMIC_INSTITUTION.is_match(text) {
            academic += PATTERN_BOOST;
        }

        let known_companies = count_present(&self.known_companies, text);
        industry += known_companies * KNOWN_COMPANY_WEIGHT;

        KeywordCounts {
            academic,
            industry,
            known_companies,
        }
    }
}

/// Number of distinct keywords occurring as substrings of `text`
fn count_present(keywords: &[String], text: &str) -> usize {
    keywords.iter().filter(|k| text.contains(k.as_str())).count()
}

/// First rule of the table that applies to `counts`
pub fn decide(counts: &KeywordCounts) -> &'static AffiliationRule {
    AFFILIATION_RULES
        .iter()
        .find(|rule| (rule.applies)(*counts))
        .unwrap_or(&AFFILIATION_RULES[AFFILIATION_RULES.len() - 1])
}
