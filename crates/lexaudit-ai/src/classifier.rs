//! Turn normalized gap records into typed [`Gap`]s.
//!
//! Records without a usable title or description are dropped with a warning.
//! Input order is preserved; prioritization happens where it is needed.

use serde_json::Value;
use tracing::{info, warn};

use lexaudit_core::{Gap, Severity, SeverityCounts};

use crate::normalize::{
    self, ARTICLES, DESCRIPTION, GAP_ID, IMPACT, RECOMMENDATION, SEVERITY, TITLE,
    scalar_text, sequential_gap_id, string_list,
};

/// Outcome counts of one classification pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassificationSummary {
    pub kept: usize,
    pub dropped: usize,
    pub by_severity: SeverityCounts,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GapClassifier;

impl GapClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify one record. `index` is its position in the upstream list and
    /// seeds the fallback id. `None` when title or description is blank.
    pub fn classify(&self, index: usize, raw: &Value) -> Option<Gap> {
        let id = raw
            .get(GAP_ID)
            .and_then(scalar_text)
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| sequential_gap_id(index));

        let title = text_field(raw, TITLE);
        let description = text_field(raw, DESCRIPTION);
        if title.is_empty() || description.is_empty() {
            warn!(
                gap_id = %id,
                missing = if title.is_empty() { TITLE } else { DESCRIPTION },
                "dropping gap without required text"
            );
            return None;
        }

        let severity = raw
            .get(SEVERITY)
            .and_then(Value::as_str)
            .and_then(Severity::parse)
            .unwrap_or(Severity::Medium);

        let articles = raw.get(ARTICLES).cloned().map(string_list).unwrap_or_default();

        let impact = match raw.get(IMPACT) {
            Some(Value::Object(map)) => flatten_impact(map),
            Some(other) => scalar_text(other).unwrap_or_default(),
            None => String::new(),
        };
        let impact = if impact.trim().is_empty() {
            normalize::DEFAULT_IMPACT.to_string()
        } else {
            impact
        };

        let recommendation = match text_field(raw, RECOMMENDATION) {
            r if r.is_empty() => normalize::DEFAULT_RECOMMENDATION.to_string(),
            r => r,
        };

        Some(Gap {
            id,
            title,
            description,
            severity,
            articles,
            impact,
            recommendation,
        })
    }

    /// Classify every record, keeping input order.
    pub fn classify_batch(&self, raw_gaps: &[Value]) -> (Vec<Gap>, ClassificationSummary) {
        let gaps: Vec<Gap> = raw_gaps
            .iter()
            .enumerate()
            .filter_map(|(index, raw)| self.classify(index, raw))
            .collect();
        let summary = ClassificationSummary {
            kept: gaps.len(),
            dropped: raw_gaps.len() - gaps.len(),
            by_severity: SeverityCounts::from_gaps(&gaps),
        };

        info!(
            kept = summary.kept,
            dropped = summary.dropped,
            critical = summary.by_severity.critical,
            high = summary.by_severity.high,
            medium = summary.by_severity.medium,
            low = summary.by_severity.low,
            "classified gaps"
        );
        (gaps, summary)
    }
}

fn text_field(raw: &Value, key: &str) -> String {
    raw.get(key)
        .and_then(scalar_text)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// `{"legal_risk": "fines", "users": ["a", "b"]}` → `"Legal Risk: fines\nUsers: a, b"`
fn flatten_impact(map: &serde_json::Map<String, Value>) -> String {
    map.iter()
        .map(|(key, value)| {
            let value = match value {
                Value::Array(items) => items
                    .iter()
                    .map(|item| scalar_text(item).unwrap_or_else(|| item.to_string()))
                    .collect::<Vec<_>>()
                    .join(", "),
                other => scalar_text(other).unwrap_or_else(|| other.to_string()),
            };
            format!("{}: {}", title_case(key), value)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `"legal_risk"` → `"Legal Risk"`
fn title_case(key: &str) -> String {
    key.split(['_', ' ', '-'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
