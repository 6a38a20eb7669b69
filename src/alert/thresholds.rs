//! Air quality severity levels and the publish threshold.
//!
//! The UBA feed tags every component with an index code. This module maps
//! that code onto a discrete severity and decides whether a severity is bad
//! enough to publish.

use serde::Deserialize;

/// Severity levels, in ascending order of severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Good,
    Moderate,
    Poor,
    Critical,
}

impl Severity {
    /// Classifies a raw index code: 0 good, 1 moderate, 2 poor, anything
    /// else (including a missing or unparseable code) critical.
    pub fn from_code(code: Option<i64>) -> Severity {
        match code {
            Some(0) => Severity::Good,
            Some(1) => Severity::Moderate,
            Some(2) => Severity::Poor,
            _ => Severity::Critical,
        }
    }

    /// Status label shown in reports.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Good => "🟢 Gut",
            Severity::Moderate => "🟡 Mittelmäßig",
            Severity::Poor => "🔴 Schlecht (😷)",
            Severity::Critical => "⚫ Kritisch (😷)",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Good => write!(f, "good"),
            Severity::Moderate => write!(f, "moderate"),
            Severity::Poor => write!(f, "poor"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Lowest severity that triggers a publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertThreshold {
    pub min_severity: Severity,
}

impl Default for AlertThreshold {
    /// Anything other than "good" is worth posting.
    fn default() -> Self {
        AlertThreshold {
            min_severity: Severity::Moderate,
        }
    }
}

impl AlertThreshold {
    pub fn new(min_severity: Severity) -> Self {
        AlertThreshold { min_severity }
    }

    pub fn is_breached_by(&self, severity: Severity) -> bool {
        severity >= self.min_severity
    }

    /// True if any of `severities` breaches the threshold.
    pub fn is_breached_by_any<I>(&self, severities: I) -> bool
    where
        I: IntoIterator<Item = Severity>,
    {
        severities.into_iter().any(|s| self.is_breached_by(s))
    }
}
