// Query templating - `$name` placeholder substitution and pagination clauses
use super::error::DashboardError;
use super::filters::FilterSet;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").expect("placeholder pattern"));

static TRAILING_LIMIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+LIMIT\s+\d+(?:\s+OFFSET\s+\d+)?\s*$").expect("limit pattern")
});

/// Distinct placeholder names in order of first occurrence, without the `$`.
pub fn placeholders(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(text) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Wraps a filter value as a SQL string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Result of substituting filter values into a query template.
#[derive(Debug, Clone, PartialEq)]
pub struct Templated {
    text: String,
    unresolved: Vec<String>,
}

impl Templated {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn unresolved(&self) -> &[String] {
        &self.unresolved
    }

    /// A query with surviving placeholders must never be sent downstream,
    /// including tokens carried in by substituted values.
    pub fn validate(self) -> Result<String, DashboardError> {
        if self.unresolved.is_empty() {
            Ok(self.text)
        } else {
            Err(DashboardError::Templating {
                unresolved: self.unresolved,
            })
        }
    }
}

/// Replaces every `$name` token whose slot has a value with the quoted value.
///
/// Tokens are matched whole, so `$brand` never rewrites part of `$brand_id`.
/// Values are inserted once; `unresolved` lists every token left in the result.
pub fn substitute(template: &str, filters: &FilterSet) -> Templated {
    let text = PLACEHOLDER
        .replace_all(template, |caps: &Captures| match filters.value(&caps[1]) {
            Some(value) => {
                tracing::debug!("Substituting ${} with '{}'", &caps[1], value);
                quote_literal(value)
            }
            None => caps[0].to_string(),
        })
        .into_owned();
    let unresolved = placeholders(&text);

    Templated { text, unresolved }
}

/// Replaces any trailing `LIMIT n [OFFSET m]` with the clause for `page`.
pub fn paginate(query: &str, page: u32, page_size: u32) -> String {
    let trimmed = query.trim_end();
    let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();
    let base = TRAILING_LIMIT.replace(trimmed, "");
    let offset = u64::from(page) * u64::from(page_size);
    format!("{base} LIMIT {page_size} OFFSET {offset}")
}
