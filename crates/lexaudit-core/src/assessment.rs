//! Typed assessment records produced by the analysis pipeline.

use serde::{Deserialize, Serialize};

use crate::score::{Grade, RiskTier};

/// Importance of a compliance gap.
///
/// Variant order is the severity order: `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Parse a severity label case-insensitively. Returns `None` for unknown labels.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Remediation priority: 0 for critical through 3 for low.
    pub fn priority_rank(&self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }
}

/// Estimated effort to implement a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffortLevel {
    Low,
    Medium,
    High,
}

impl EffortLevel {
    /// Parse an effort label from its leading word, so `"High (3 weeks)"` and
    /// `"low/medium"` are accepted. Returns `None` when no level is recognised.
    pub fn parse(s: &str) -> Option<Self> {
        let word: String = s
            .trim()
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();
        match word.to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// A detected deficiency in the assessed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gap {
    pub id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    /// Citation keys such as `"S. 37"`, in upstream order. May be empty.
    pub articles: Vec<String>,
    pub impact: String,
    pub recommendation: String,
}

/// How a [`Fix`] was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixSource {
    /// Parsed from an enrichment response.
    Generated,
    /// Built from the gap's own fields after the enrichment call failed.
    Fallback,
}

/// A remediation artifact addressing exactly one [`Gap`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fix {
    pub gap_id: String,
    pub title: String,
    pub suggested_text: String,
    /// Never empty.
    pub implementation_steps: Vec<String>,
    pub effort_level: EffortLevel,
    pub current_text: Option<String>,
    pub timeline: Option<String>,
    pub responsible_parties: Vec<String>,
    pub success_criteria: Option<String>,
    pub source: FixSource,
}

/// A citation attached to the assessment, unique per `(regulation, article)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalReference {
    pub regulation: String,
    pub article: String,
    pub title: String,
    pub summary: String,
    pub relevance: String,
}

/// Narrative overview of the assessment. Always fully populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutiveSummary {
    pub overall_assessment: String,
    pub key_strengths: Vec<String>,
    pub critical_weaknesses: Vec<String>,
    pub immediate_actions: Vec<String>,
    pub compliance_roadmap: String,
    pub estimated_total_remediation_cost: String,
    pub estimated_compliance_timeline: String,
}

/// Gap counts per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    pub fn from_gaps(gaps: &[Gap]) -> Self {
        let mut counts = Self::default();
        for gap in gaps {
            counts.record(gap.severity);
        }
        counts
    }

    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }
}

/// Final output of one analysis.
///
/// Invariants: `score` is within `0..=120`, `risk_tier` and `grade` are derived
/// from `score`, every `fixes[].gap_id` names an entry of `gaps`, and
/// `references` holds no duplicate `(regulation, article)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResult {
    pub score: u32,
    pub risk_tier: RiskTier,
    pub grade: Grade,
    pub gaps: Vec<Gap>,
    pub gaps_by_severity: SeverityCounts,
    pub fixes: Vec<Fix>,
    pub references: Vec<LegalReference>,
    pub executive_summary: ExecutiveSummary,
    pub summary: String,
    /// True when the upstream text could only be scraped heuristically.
    pub degraded: bool,
}
