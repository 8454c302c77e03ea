//! Organization name extraction from affiliation strings.

use regex::Regex;
use std::sync::LazyLock;

/// Leading organizational-unit prefix
static UNIT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(department of|division of|section of)\s+").expect("Invalid prefix regex")
});

/// Best-effort organization label for an affiliation.
///
/// Takes the segment before the first comma or semicolon and strips a leading
/// `Department of` / `Division of` / `Section of`. Case is preserved. The
/// result is not checked to actually be a company.
pub fn extract_company_name(affiliation: &str) -> String {
    let leading = affiliation
        .split([',', ';'])
        .next()
        .unwrap_or(affiliation)
        .trim();

    UNIT_PREFIX.replace(leading, "").trim().to_string()
}
