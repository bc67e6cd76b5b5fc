// AudSleuth - core/filter.rs
//
// Substring filter engine for decoded records.
// Within a category any pattern in any associated field is enough; across
// categories all filters are AND-combined.
// Core layer: pure logic, no I/O.

use crate::core::model::{FieldId, Record};
use crate::util::error::FilterError;
use std::fmt;
use std::str::FromStr;

/// A filterable aspect of a record. Some categories look at more than one
/// field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterCategory {
    ConnectionType,
    Terminal,
    Login,
    TransactionCode,
    Report,
    Client,
}

impl FilterCategory {
    pub const ALL: [FilterCategory; 6] = [
        FilterCategory::ConnectionType,
        FilterCategory::Terminal,
        FilterCategory::Login,
        FilterCategory::TransactionCode,
        FilterCategory::Report,
        FilterCategory::Client,
    ];

    /// Record fields searched for this category.
    ///
    /// Transaction codes also show up inside parameter text, and the
    /// terminal name lives in both the short terminal field and the
    /// remote host field.
    pub fn fields(self) -> &'static [FieldId] {
        match self {
            FilterCategory::ConnectionType => &[FieldId::ConnectionType],
            FilterCategory::Terminal => &[FieldId::Terminal, FieldId::RemoteHost],
            FilterCategory::Login => &[FieldId::Login],
            FilterCategory::TransactionCode => &[FieldId::TransactionCode, FieldId::Parameters],
            FilterCategory::Report => &[FieldId::Report],
            FilterCategory::Client => &[FieldId::Client],
        }
    }

    /// Key used on the command line and in config.toml.
    pub fn key(self) -> &'static str {
        match self {
            FilterCategory::ConnectionType => "typecon",
            FilterCategory::Terminal => "terminal",
            FilterCategory::Login => "login",
            FilterCategory::TransactionCode => "tcode",
            FilterCategory::Report => "report",
            FilterCategory::Client => "client",
        }
    }
}

impl fmt::Display for FilterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for FilterCategory {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterCategory::ALL
            .iter()
            .copied()
            .find(|c| c.key() == s)
            .ok_or_else(|| FilterError::UnknownCategory {
                name: s.to_string(),
            })
    }
}

/// Per-category substring lists. An empty list matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub connection_type: Vec<String>,
    pub terminal: Vec<String>,
    pub login: Vec<String>,
    pub transaction_code: Vec<String>,
    pub report: Vec<String>,
    pub client: Vec<String>,
}

impl FilterSpec {
    /// Patterns configured for `category`.
    pub fn patterns(&self, category: FilterCategory) -> &[String] {
        match category {
            FilterCategory::ConnectionType => &self.connection_type,
            FilterCategory::Terminal => &self.terminal,
            FilterCategory::Login => &self.login,
            FilterCategory::TransactionCode => &self.transaction_code,
            FilterCategory::Report => &self.report,
            FilterCategory::Client => &self.client,
        }
    }

    fn patterns_mut(&mut self, category: FilterCategory) -> &mut Vec<String> {
        match category {
            FilterCategory::ConnectionType => &mut self.connection_type,
            FilterCategory::Terminal => &mut self.terminal,
            FilterCategory::Login => &mut self.login,
            FilterCategory::TransactionCode => &mut self.transaction_code,
            FilterCategory::Report => &mut self.report,
            FilterCategory::Client => &mut self.client,
        }
    }

    /// Replace the patterns of the category named `key`.
    pub fn set(&mut self, key: &str, patterns: Vec<String>) -> Result<(), FilterError> {
        let category: FilterCategory = key.parse()?;
        *self.patterns_mut(category) = patterns;
        Ok(())
    }

    /// Returns true if no filters are active.
    pub fn is_empty(&self) -> bool {
        FilterCategory::ALL
            .iter()
            .all(|c| self.patterns(*c).is_empty())
    }

    /// Categories that carry at least one pattern.
    pub fn active_categories(&self) -> impl Iterator<Item = FilterCategory> + '_ {
        FilterCategory::ALL
            .into_iter()
            .filter(|c| !self.patterns(*c).is_empty())
    }
}

/// Check whether `record` passes every category of `spec`.
pub fn matches(record: &Record, spec: &FilterSpec) -> bool {
    FilterCategory::ALL
        .iter()
        .all(|category| category_matches(record, *category, spec.patterns(*category)))
}

/// Vacuously true for an empty pattern list; otherwise true when any
/// pattern is a (case-sensitive) substring of any associated field.
fn category_matches(record: &Record, category: FilterCategory, patterns: &[String]) -> bool {
    if patterns.is_empty() {
        return true;
    }
    patterns.iter().any(|pattern| {
        category
            .fields()
            .iter()
            .any(|field| record.get(*field).contains(pattern.as_str()))
    })
}
