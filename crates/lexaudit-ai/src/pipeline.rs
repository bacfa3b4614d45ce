//! The analysis entry point.
//!
//! [`Analyzer`] owns the injected collaborators and runs the whole chain:
//! prompt, upstream call, extraction, normalization, classification, score,
//! references, then fix enrichment. Only the primary upstream call can fail
//! an analysis; every later stage degrades instead.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{info, warn};

use lexaudit_core::{
    AssessmentResult, CitationTable, ExecutiveSummary, Grade, RiskTier, resolve_score,
};

use crate::classifier::GapClassifier;
use crate::error::AnalysisError;
use crate::extract::extract;
use crate::fixes::{FixOptions, FixOrchestrator};
use crate::generate::{GenerationParams, TextGenerator};
use crate::normalize::{
    self, COMPLIANCE_ROADMAP, COMPLIANCE_SCORE, COMPLIANCE_TIMELINE, CRITICAL_WEAKNESSES,
    EXECUTIVE_SUMMARY, GAPS, IMMEDIATE_ACTIONS, KEY_STRENGTHS, LEGAL_REFERENCES,
    OVERALL_ASSESSMENT, REMEDIATION_COST, SUMMARY, scalar_text, string_list,
};
use crate::prompts::{AnalysisRequest, PromptTemplates};
use crate::references::ReferenceResolver;
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyzerOptions {
    /// Parameters of the primary analysis call.
    pub params: GenerationParams,
    /// Deadline for each attempt of the primary call.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub fixes: FixOptions,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            params: GenerationParams::new(0.1, 8192),
            timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
            fixes: FixOptions::default(),
        }
    }
}

pub struct Analyzer {
    generator: Arc<dyn TextGenerator>,
    templates: Arc<PromptTemplates>,
    options: AnalyzerOptions,
    classifier: GapClassifier,
    fixes: FixOrchestrator,
    references: ReferenceResolver,
}

impl Analyzer {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        citations: Arc<CitationTable>,
        templates: Arc<PromptTemplates>,
        options: AnalyzerOptions,
    ) -> Self {
        Self {
            fixes: FixOrchestrator::new(generator.clone(), options.fixes),
            references: ReferenceResolver::new(citations),
            classifier: GapClassifier::new(),
            generator,
            templates,
            options,
        }
    }

    pub fn options(&self) -> &AnalyzerOptions {
        &self.options
    }

    /// Analyze a document end to end.
    pub async fn analyze(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AssessmentResult, AnalysisError> {
        if request.document_text.trim().is_empty() {
            return Err(AnalysisError::EmptyDocument);
        }
        info!(
            company = %request.company_name,
            document_type = request.document_type.as_str(),
            chars = request.document_text.chars().count(),
            "starting analysis"
        );

        let prompt = self.templates.analysis_prompt(request);
        let raw = self
            .options
            .retry
            .generate(
                self.generator.as_ref(),
                &prompt,
                self.options.params,
                self.options.timeout,
            )
            .await?;
        info!(chars = raw.len(), "received analysis response");

        Ok(self.assess_response(&raw).await)
    }

    /// Turn a raw upstream response into an assessment. Never fails.
    pub async fn assess_response(&self, raw: &str) -> AssessmentResult {
        let extraction = extract(raw);
        let degraded = extraction.is_degraded();
        let doc = normalize::normalize(extraction.document);

        let score = resolve_score(doc.get(COMPLIANCE_SCORE).unwrap_or(&Value::Null));
        let raw_gaps = list_at(&doc, GAPS);
        let (gaps, classification) = self.classifier.classify_batch(raw_gaps);
        let references = self.references.resolve(list_at(&doc, LEGAL_REFERENCES), &gaps);
        let fixes = self.fixes.generate_fixes(&gaps).await;

        let executive_summary = match doc.get(EXECUTIVE_SUMMARY) {
            Some(Value::Object(map)) => executive_summary(map),
            _ => executive_summary(&Map::new()),
        };
        let summary = doc
            .get(SUMMARY)
            .and_then(scalar_text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| default_summary(score, gaps.len()));

        if degraded {
            warn!(score, gaps = gaps.len(), "assessment built from scraped text");
        }
        info!(
            score,
            risk_tier = RiskTier::from_score(score).as_str(),
            gaps = gaps.len(),
            fixes = fixes.len(),
            references = references.len(),
            "analysis complete"
        );

        AssessmentResult {
            score,
            risk_tier: RiskTier::from_score(score),
            grade: Grade::from_score(score),
            gaps,
            gaps_by_severity: classification.by_severity,
            fixes,
            references,
            executive_summary,
            summary,
            degraded,
        }
    }
}

fn list_at<'a>(doc: &'a Value, key: &str) -> &'a [Value] {
    doc.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn executive_summary(map: &Map<String, Value>) -> ExecutiveSummary {
    let text = |key: &str, default: &str| {
        map.get(key)
            .and_then(scalar_text)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| default.to_string())
    };
    let list = |key: &str| map.get(key).cloned().map(string_list).unwrap_or_default();

    ExecutiveSummary {
        overall_assessment: text(OVERALL_ASSESSMENT, normalize::DEFAULT_OVERALL_ASSESSMENT),
        key_strengths: list(KEY_STRENGTHS),
        critical_weaknesses: list(CRITICAL_WEAKNESSES),
        immediate_actions: list(IMMEDIATE_ACTIONS),
        compliance_roadmap: text(COMPLIANCE_ROADMAP, normalize::DEFAULT_COMPLIANCE_ROADMAP),
        estimated_total_remediation_cost: text(REMEDIATION_COST, normalize::DEFAULT_REMEDIATION_COST),
        estimated_compliance_timeline: text(COMPLIANCE_TIMELINE, normalize::DEFAULT_COMPLIANCE_TIMELINE),
    }
}

/// One-line summary used when upstream supplied none.
pub fn default_summary(score: u32, gap_count: usize) -> String {
    let verdict = match score {
        85.. => "Good",
        70..=84 => "Acceptable",
        50..=69 => "Needs Improvement",
        _ => "Critical",
    };
    format!(
        "Compliance Score: {score}/100 ({verdict}). Found {gap_count} compliance gap(s). Review detailed analysis for remediation steps."
    )
}
