//! Total defaulting of extracted documents to the upstream schema.
//!
//! After [`normalize`] every required key is present with a value of the
//! expected shape, whatever the input was. Values are coerced, never
//! validated; rejecting unusable gaps is the classifier's job.

use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::error::FixFailure;

// ── Upstream keys ──

pub const COMPLIANCE_SCORE: &str = "compliance_score";
pub const RISK_LEVEL: &str = "risk_level";
pub const SUMMARY: &str = "summary";
pub const GAPS: &str = "gaps";
pub const EXECUTIVE_SUMMARY: &str = "executive_summary";
pub const LEGAL_REFERENCES: &str = "legal_references";

pub const GAP_ID: &str = "gap_id";
pub const TITLE: &str = "title";
pub const DESCRIPTION: &str = "description";
pub const SEVERITY: &str = "severity";
pub const ARTICLES: &str = "ndpr_articles";
pub const ARTICLES_ALIAS: &str = "articles";
pub const IMPACT: &str = "impact";
pub const RECOMMENDATION: &str = "recommendation";

pub const OVERALL_ASSESSMENT: &str = "overall_assessment";
pub const KEY_STRENGTHS: &str = "key_strengths";
pub const CRITICAL_WEAKNESSES: &str = "critical_weaknesses";
pub const IMMEDIATE_ACTIONS: &str = "immediate_actions";
pub const COMPLIANCE_ROADMAP: &str = "compliance_roadmap";
pub const REMEDIATION_COST: &str = "estimated_total_remediation_cost";
pub const COMPLIANCE_TIMELINE: &str = "estimated_compliance_timeline";

pub const SUGGESTED_TEXT: &str = "suggested_text";
pub const IMPLEMENTATION_STEPS: &str = "implementation_steps";
pub const EFFORT_LEVEL: &str = "effort_level";
pub const CURRENT_TEXT: &str = "current_text";
pub const ESTIMATED_TIMELINE: &str = "estimated_timeline";
pub const RESPONSIBLE_PARTIES: &str = "responsible_parties";
pub const SUCCESS_CRITERIA: &str = "success_criteria";

// ── Defaults ──

pub const DEFAULT_SCORE: u32 = lexaudit_core::score::DEFAULT_SCORE;
pub const DEFAULT_RISK_LEVEL: &str = "high";
pub const DEFAULT_SEVERITY: &str = "medium";
pub const DEFAULT_IMPACT: &str = "Impact assessment not provided";
pub const DEFAULT_RECOMMENDATION: &str = "Review policy section manually";

pub const DEFAULT_OVERALL_ASSESSMENT: &str = "Analysis completed with AI assistance";
pub const DEFAULT_COMPLIANCE_ROADMAP: &str = "Review detailed gaps for remediation plan";
pub const DEFAULT_REMEDIATION_COST: &str = "NGN 0 - To be assessed";
pub const DEFAULT_COMPLIANCE_TIMELINE: &str = "To be determined based on gaps";

pub const DEFAULT_SUGGESTED_TEXT: &str = "See recommendation for guidance.";
pub const DEFAULT_IMPLEMENTATION_STEPS: [&str; 3] =
    ["Review gap details", "Update policy text", "Verify compliance"];
pub const DEFAULT_EFFORT_LEVEL: &str = "medium";

/// Sequential id for the gap at `index` when upstream supplied none.
pub fn sequential_gap_id(index: usize) -> String {
    format!("gap_{index:03}")
}

/// Normalize a full assessment document.
pub fn normalize(document: Value) -> Value {
    let mut doc = match document {
        Value::Object(map) => map,
        other => {
            warn!(kind = kind(&other), "assessment document is not an object, starting empty");
            Map::new()
        }
    };

    doc.entry(COMPLIANCE_SCORE).or_insert_with(|| json!(DEFAULT_SCORE));
    doc.entry(RISK_LEVEL).or_insert_with(|| json!(DEFAULT_RISK_LEVEL));

    let gaps = match doc.remove(GAPS) {
        Some(Value::Array(items)) => items,
        Some(other) => {
            warn!(kind = kind(&other), "gaps is not a list, discarding");
            Vec::new()
        }
        None => Vec::new(),
    };
    let gaps: Vec<Value> = gaps
        .into_iter()
        .enumerate()
        .map(|(index, gap)| Value::Object(normalize_gap(index, gap)))
        .collect();
    debug!(count = gaps.len(), "normalized gaps");
    doc.insert(GAPS.into(), Value::Array(gaps));

    let summary = normalize_executive_summary(doc.remove(EXECUTIVE_SUMMARY));
    doc.insert(EXECUTIVE_SUMMARY.into(), Value::Object(summary));

    let references: Vec<Value> = match doc.remove(LEGAL_REFERENCES) {
        Some(Value::Array(items)) => items.into_iter().filter(Value::is_object).collect(),
        _ => Vec::new(),
    };
    doc.insert(LEGAL_REFERENCES.into(), Value::Array(references));

    Value::Object(doc)
}

fn normalize_gap(index: usize, gap: Value) -> Map<String, Value> {
    let mut gap = match gap {
        Value::Object(map) => map,
        other => {
            warn!(index, kind = kind(&other), "gap is not an object, substituting empty");
            Map::new()
        }
    };

    let id = gap
        .get(GAP_ID)
        .and_then(scalar_text)
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| sequential_gap_id(index));
    gap.insert(GAP_ID.into(), json!(id));

    for key in [TITLE, DESCRIPTION] {
        let text = gap.get(key).and_then(scalar_text).unwrap_or_default();
        gap.insert(key.into(), json!(text));
    }

    let severity = gap
        .get(SEVERITY)
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_SEVERITY)
        .to_string();
    gap.insert(SEVERITY.into(), json!(severity));

    let articles = gap
        .remove(ARTICLES)
        .or_else(|| gap.remove(ARTICLES_ALIAS))
        .map(string_list)
        .unwrap_or_default();
    gap.remove(ARTICLES_ALIAS);
    gap.insert(ARTICLES.into(), json!(articles));

    match gap.get(IMPACT) {
        Some(Value::String(_) | Value::Object(_)) => {}
        _ => {
            gap.insert(IMPACT.into(), json!(DEFAULT_IMPACT));
        }
    }

    let recommendation = gap
        .get(RECOMMENDATION)
        .and_then(scalar_text)
        .unwrap_or_else(|| DEFAULT_RECOMMENDATION.to_string());
    gap.insert(RECOMMENDATION.into(), json!(recommendation));

    gap
}

fn normalize_executive_summary(summary: Option<Value>) -> Map<String, Value> {
    let mut summary = match summary {
        Some(Value::Object(map)) => map,
        Some(Value::String(text)) => {
            let mut map = Map::new();
            map.insert(OVERALL_ASSESSMENT.into(), json!(text));
            map
        }
        _ => Map::new(),
    };

    for (key, default) in [
        (OVERALL_ASSESSMENT, DEFAULT_OVERALL_ASSESSMENT),
        (COMPLIANCE_ROADMAP, DEFAULT_COMPLIANCE_ROADMAP),
        (REMEDIATION_COST, DEFAULT_REMEDIATION_COST),
        (COMPLIANCE_TIMELINE, DEFAULT_COMPLIANCE_TIMELINE),
    ] {
        let text = summary
            .get(key)
            .and_then(scalar_text)
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| default.to_string());
        summary.insert(key.into(), json!(text));
    }

    for key in [KEY_STRENGTHS, CRITICAL_WEAKNESSES, IMMEDIATE_ACTIONS] {
        let items = summary.remove(key).map(string_list).unwrap_or_default();
        summary.insert(key.into(), json!(items));
    }

    summary
}

/// Normalize a fix enrichment response. Anything but an object is a parse
/// failure; inside an object every field defaults.
pub fn normalize_fix(document: Value) -> Result<Map<String, Value>, FixFailure> {
    let Value::Object(mut fix) = document else {
        return Err(FixFailure::Unparseable("fix response is not an object"));
    };

    let suggested = fix
        .get(SUGGESTED_TEXT)
        .and_then(scalar_text)
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SUGGESTED_TEXT.to_string());
    fix.insert(SUGGESTED_TEXT.into(), json!(suggested));

    let mut steps = fix
        .remove(IMPLEMENTATION_STEPS)
        .map(string_list)
        .unwrap_or_default();
    if steps.is_empty() {
        steps = DEFAULT_IMPLEMENTATION_STEPS.map(String::from).to_vec();
    }
    fix.insert(IMPLEMENTATION_STEPS.into(), json!(steps));

    let effort = fix
        .get(EFFORT_LEVEL)
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_EFFORT_LEVEL)
        .to_string();
    fix.insert(EFFORT_LEVEL.into(), json!(effort));

    let parties = fix
        .remove(RESPONSIBLE_PARTIES)
        .map(string_list)
        .unwrap_or_default();
    fix.insert(RESPONSIBLE_PARTIES.into(), json!(parties));

    Ok(fix)
}

/// Text of a scalar: strings as-is, numbers and booleans stringified.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Coerce to a list of non-blank strings. A lone scalar becomes a
/// one-element list; nulls, blanks and nested structures are dropped.
pub fn string_list(value: Value) -> Vec<String> {
    let items = match value {
        Value::Array(items) => items,
        other => vec![other],
    };
    items
        .iter()
        .filter_map(scalar_text)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
