//! Merge AI-supplied citations with citations derived from the gaps.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use lexaudit_core::citations::canonical_citation_key;
use lexaudit_core::{CitationTable, Gap, LegalReference, NDPA_2023, canonical_regulation};

use crate::normalize::scalar_text;

pub const DEFAULT_TITLE: &str = "NDPA Provision";
pub const DEFAULT_SUMMARY: &str = "See NDPA for details";
pub const DEFAULT_RELEVANCE: &str = "Referenced in compliance gaps";

pub struct ReferenceResolver {
    table: Arc<CitationTable>,
}

impl ReferenceResolver {
    pub fn new(table: Arc<CitationTable>) -> Self {
        Self { table }
    }

    /// AI-supplied references first (their values win), then one reference
    /// per gap article not already covered. Unique by `(regulation, article)`.
    pub fn resolve(&self, ai_references: &[Value], gaps: &[Gap]) -> Vec<LegalReference> {
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut references = Vec::new();

        for raw in ai_references {
            let Some(reference) = from_ai(raw) else {
                continue;
            };
            if seen.insert((reference.regulation.clone(), reference.article.clone())) {
                references.push(reference);
            } else {
                debug!(article = %reference.article, "skipping duplicate reference");
            }
        }
        let supplied = references.len();

        for gap in gaps {
            for article in &gap.articles {
                let article = canonical_citation_key(article);
                if article.is_empty() {
                    continue;
                }
                if !seen.insert((NDPA_2023.to_string(), article.clone())) {
                    continue;
                }
                references.push(LegalReference {
                    regulation: NDPA_2023.to_string(),
                    title: self.table.title(&article),
                    summary: self.table.summary(&article),
                    relevance: format!("Violated in: {}", gap.title),
                    article,
                });
            }
        }

        debug!(
            supplied,
            derived = references.len() - supplied,
            "resolved legal references"
        );
        references
    }
}

fn from_ai(raw: &Value) -> Option<LegalReference> {
    let text = |key: &str| {
        raw.get(key)
            .and_then(scalar_text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };

    let article = canonical_citation_key(&text("article")?);
    Some(LegalReference {
        regulation: canonical_regulation(&text("regulation").unwrap_or_default()),
        article,
        title: text("title").unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        summary: text("summary")
            .or_else(|| text("interpretation"))
            .unwrap_or_else(|| DEFAULT_SUMMARY.to_string()),
        relevance: text("relevance").unwrap_or_else(|| DEFAULT_RELEVANCE.to_string()),
    })
}
