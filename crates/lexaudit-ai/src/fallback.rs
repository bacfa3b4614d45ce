//! Last-resort field scraping for responses with no parseable structure.
//!
//! Produces a document in the upstream schema so it flows through the
//! normalizer like any other. Anything the scraper cannot find is filled with
//! placeholder text that tells the reader a manual review is needed.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value, json};

use lexaudit_core::NDPA_2023;

/// Maximum number of gaps scraped from one response.
pub const MAX_SCRAPED_GAPS: usize = 5;

static SCORE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)score["']?\s*[:=]?\s*(\d+)"#).expect("valid regex")
});

// Everything from a "gap" mention up to the next closing brace.
static GAP_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)gap[^}]*").expect("valid regex"));

static ARTICLES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)["']?(?:ndpr_articles|articles)["']?\s*:?\s*\[([^\]]*)\]"#)
        .expect("valid regex")
});

/// Quoted, single-quoted, then bare `field: value` patterns for one field.
struct FieldPatterns([Regex; 3]);

impl FieldPatterns {
    fn new(field: &str) -> Self {
        let compile = |pattern: String| Regex::new(&pattern).expect("valid regex");
        Self([
            compile(format!(r#"(?i)"{field}"\s*:?\s*"((?:[^"\\]|\\.)*)""#)),
            compile(format!(r"(?i)'{field}'\s*:?\s*'([^']*)'")),
            compile(format!(r"(?i)\b{field}\s*:\s*([^,\n}}]+)")),
        ])
    }

    fn find(&self, text: &str) -> Option<String> {
        self.0.iter().find_map(|re| {
            re.captures(text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().trim_matches('"').to_string())
                .filter(|s| !s.is_empty())
        })
    }
}

static TITLE: LazyLock<FieldPatterns> = LazyLock::new(|| FieldPatterns::new("title"));
static DESCRIPTION: LazyLock<FieldPatterns> = LazyLock::new(|| FieldPatterns::new("description"));
static SEVERITY: LazyLock<FieldPatterns> = LazyLock::new(|| FieldPatterns::new("severity"));
static IMPACT: LazyLock<FieldPatterns> = LazyLock::new(|| FieldPatterns::new("impact"));
static RECOMMENDATION: LazyLock<FieldPatterns> =
    LazyLock::new(|| FieldPatterns::new("recommendation"));
static SUMMARY: LazyLock<FieldPatterns> = LazyLock::new(|| FieldPatterns::new("summary"));

/// Scrape whatever assessment fields can be found in free text.
pub fn scrape(text: &str) -> Value {
    let mut doc = Map::new();

    if let Some(score) = scrape_score(text) {
        doc.insert("compliance_score".into(), json!(score));
    }
    if let Some(summary) = SUMMARY.find(text) {
        doc.insert("summary".into(), json!(summary));
    }

    let mut gaps = scrape_gaps(text);
    if gaps.is_empty() {
        gaps.push(manual_review_gap());
    }
    tracing::info!(gaps = gaps.len(), "scraped fallback assessment");
    doc.insert("gaps".into(), Value::Array(gaps));
    doc.insert("executive_summary".into(), degraded_executive_summary());
    doc.insert(
        "legal_references".into(),
        json!([{
            "regulation": NDPA_2023,
            "article": "S. 24",
            "title": "Data Protection Principles",
            "summary": "Personal data must be processed lawfully, fairly, and transparently",
            "relevance": "Fundamental compliance requirement",
        }]),
    );
    Value::Object(doc)
}

/// Raw scraped score; out-of-range values are left for `resolve_score`.
fn scrape_score(text: &str) -> Option<u64> {
    let digits = SCORE.captures(text)?.get(1)?.as_str();
    // Only overflow can fail on an all-digit capture.
    Some(digits.parse().unwrap_or(u64::MAX))
}

fn scrape_gaps(text: &str) -> Vec<Value> {
    GAP_SECTION
        .find_iter(text)
        .take(MAX_SCRAPED_GAPS)
        .enumerate()
        .map(|(i, section)| {
            let section = section.as_str();
            json!({
                "gap_id": format!("extracted_gap_{:03}", i + 1),
                "title": TITLE.find(section).unwrap_or_else(|| "Compliance Issue Identified".into()),
                "description": DESCRIPTION.find(section).unwrap_or_else(|| excerpt(section)),
                "severity": SEVERITY.find(section).unwrap_or_else(|| "medium".into()),
                "ndpr_articles": scrape_articles(section),
                "impact": IMPACT.find(section).unwrap_or_else(|| "Requires manual review".into()),
                "recommendation": RECOMMENDATION
                    .find(section)
                    .unwrap_or_else(|| "Review policy section".into()),
            })
        })
        .collect()
}

fn scrape_articles(section: &str) -> Vec<String> {
    let Some(list) = ARTICLES.captures(section).and_then(|c| c.get(1)) else {
        return Vec::new();
    };
    list.as_str()
        .split(',')
        .map(|item| item.trim().trim_matches(|c| c == '"' || c == '\'').trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// First 200 characters of `section`, marked as cut.
fn excerpt(section: &str) -> String {
    let head: String = section.chars().take(200).collect();
    format!("{}...", head.trim())
}

fn manual_review_gap() -> Value {
    json!({
        "gap_id": "fallback_gap_001",
        "title": "Policy Analysis Requires Manual Review",
        "description": "AI response parsing encountered issues. The policy should be manually reviewed for NDPA compliance.",
        "severity": "medium",
        "ndpr_articles": ["S. 24", "S. 25"],
        "impact": "Automated analysis incomplete",
        "recommendation": "Have legal counsel review the privacy policy against NDPA 2023 requirements",
    })
}

fn degraded_executive_summary() -> Value {
    json!({
        "overall_assessment": "AI analysis completed with parsing limitations. Manual review recommended for comprehensive assessment.",
        "key_strengths": ["Automated analysis attempted", "Basic structure identified"],
        "critical_weaknesses": ["AI response parsing issues", "Requires manual verification"],
        "immediate_actions": ["Review AI response manually", "Verify compliance gaps with legal expert"],
        "compliance_roadmap": "Begin with manual policy review, then address identified gaps",
        "estimated_total_remediation_cost": "NGN 0 - Assessment required",
        "estimated_compliance_timeline": "2-4 weeks with legal support",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrapes_score_from_prose_and_json_fragments() {
        assert_eq!(scrape_score("Overall Score: 73/100"), Some(73));
        assert_eq!(scrape_score(r#"{"compliance_score": 81, "gaps": ["#), Some(81));
        assert_eq!(scrape_score("no number here"), None);
    }

    #[test]
    fn oversized_score_is_kept_whole_and_clamped_later() {
        assert_eq!(scrape_score("score: 1050"), Some(1050));
        let doc = scrape("Compliance score: 1050");
        assert_eq!(lexaudit_core::resolve_score(&doc["compliance_score"]), 120);
        assert_eq!(scrape_score("score: 99999999999999999999999"), Some(u64::MAX));
    }

    #[test]
    fn missing_score_is_left_for_the_normalizer() {
        let doc = scrape("nothing useful");
        assert!(doc.get("compliance_score").is_none());
    }

    #[test]
    fn truncated_json_yields_scraped_gaps() {
        let text = r#"{"compliance_score": 40, "gaps": [{"gap_id": "g1", "title": "No DPO", "description": "Officer missing", "severity": "high", "ndpr_articles": ["S. 5", "S. 6"]}, {"gap_id": "g2", "title": "No retention per"#;
        let doc = scrape(text);
        let gaps = doc["gaps"].as_array().unwrap();
        assert_eq!(gaps.len(), 2);
        assert_eq!(gaps[0]["gap_id"], "extracted_gap_001");
        assert_eq!(gaps[0]["title"], "No DPO");
        assert_eq!(gaps[0]["description"], "Officer missing");
        assert_eq!(gaps[0]["severity"], "high");
        assert_eq!(gaps[0]["ndpr_articles"], json!(["S. 5", "S. 6"]));
        assert_eq!(gaps[0]["recommendation"], "Review policy section");
        assert_eq!(gaps[1]["gap_id"], "extracted_gap_002");
        assert_eq!(gaps[1]["severity"], "medium");
    }

    #[test]
    fn bare_field_values_are_scraped() {
        let text = "Gap 1\ntitle: Consent not recorded\nseverity: critical\n";
        let doc = scrape(text);
        assert_eq!(doc["gaps"][0]["title"], "Consent not recorded");
        assert_eq!(doc["gaps"][0]["severity"], "critical");
    }

    #[test]
    fn caps_scraped_gaps() {
        let text = "gap } ".repeat(8);
        let doc = scrape(&text);
        assert_eq!(doc["gaps"].as_array().unwrap().len(), MAX_SCRAPED_GAPS);
    }

    #[test]
    fn no_gaps_yields_manual_review_placeholder() {
        let doc = scrape("The model refused to answer.");
        let gaps = doc["gaps"].as_array().unwrap();
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0]["gap_id"], "fallback_gap_001");
        assert_eq!(gaps[0]["ndpr_articles"], json!(["S. 24", "S. 25"]));
        assert_eq!(doc["legal_references"][0]["article"], "S. 24");
        assert!(
            doc["executive_summary"]["overall_assessment"]
                .as_str()
                .unwrap()
                .contains("parsing limitations")
        );
    }

    #[test]
    fn excerpt_respects_char_boundaries() {
        let text = "gap ".to_string() + &"é".repeat(300);
        assert_eq!(excerpt(&text).chars().count(), 203);
    }
}
