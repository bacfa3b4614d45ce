//! Report envelope around an assessment, plus the two pipeline runners.

use std::time::Instant;

use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use lexaudit_ai::{AnalysisRequest, Analyzer};
use lexaudit_core::AssessmentResult;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub analysis_id: String,
    pub company_name: String,
    pub document_type: Option<String>,
    pub result: AssessmentResult,
    pub processing_time_ms: u64,
    /// RFC 3339, UTC.
    pub timestamp: String,
}

impl AnalysisReport {
    fn new(
        company_name: String,
        document_type: Option<String>,
        result: AssessmentResult,
        start: Instant,
    ) -> Self {
        Self {
            analysis_id: Uuid::new_v4().to_string(),
            company_name,
            document_type,
            result,
            processing_time_ms: start.elapsed().as_millis() as u64,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Full pipeline: prompt Gemini with the document, then recover the assessment.
pub async fn run_analysis(
    analyzer: &Analyzer,
    request: &AnalysisRequest,
) -> anyhow::Result<AnalysisReport> {
    let start = Instant::now();
    let options = analyzer.options();
    eprintln!(
        "  Analyzing {} ({} chars) for {}",
        request.document_type,
        request.document_text.chars().count(),
        request.company_name
    );
    eprintln!(
        "  Up to {} attempt(s), {}s each; up to {} fix(es), {} in flight",
        options.retry.max_attempts,
        options.timeout.as_secs(),
        options.fixes.max_fixes,
        options.fixes.concurrency
    );

    let result = analyzer
        .analyze(request)
        .await
        .context("analysis failed")?;

    let report = AnalysisReport::new(
        request.company_name.clone(),
        Some(request.document_type.to_string()),
        result,
        start,
    );
    eprintln!("  Done in {:.1}s", report.processing_time_ms as f64 / 1000.0);
    Ok(report)
}

/// Recovery only: assess a captured upstream response.
pub async fn run_assessment(
    analyzer: &Analyzer,
    company_name: String,
    raw: &str,
) -> AnalysisReport {
    let start = Instant::now();
    eprintln!("  Assessing captured response ({} chars)", raw.chars().count());

    let result = analyzer.assess_response(raw).await;
    if result.degraded {
        eprintln!("  Response was not structured; fields were scraped from text");
    }
    AnalysisReport::new(company_name, None, result, start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use lexaudit_ai::{
        AnalyzerOptions, DocumentType, GenerationParams, PromptTemplates, TextGenerator,
        UpstreamError,
    };
    use lexaudit_core::{CitationTable, FixSource, RiskTier};

    struct Canned(&'static str);

    #[async_trait]
    impl TextGenerator for Canned {
        async fn generate(
            &self,
            prompt: &str,
            _params: GenerationParams,
        ) -> Result<String, UpstreamError> {
            if prompt.contains("{company_name}") {
                return Err(UpstreamError::InvalidPrompt("unfilled placeholder".into()));
            }
            Ok(self.0.to_string())
        }
    }

    fn analyzer(reply: &'static str) -> Analyzer {
        Analyzer::new(
            Arc::new(Canned(reply)),
            Arc::new(CitationTable::builtin()),
            Arc::new(PromptTemplates::default()),
            AnalyzerOptions::default(),
        )
    }

    #[test]
    fn analyzer_keeps_configured_options() {
        let mut options = AnalyzerOptions::default();
        options.fixes.max_fixes = 2;
        let analyzer = Analyzer::new(
            Arc::new(Canned("{}")),
            Arc::new(CitationTable::builtin()),
            Arc::new(PromptTemplates::default()),
            options,
        );
        assert_eq!(*analyzer.options(), options);
    }

    #[tokio::test]
    async fn report_serializes_camel_case() {
        let analyzer = analyzer(r#"{"compliance_score": 90, "gaps": []}"#);
        let request = AnalysisRequest {
            company_name: "Acme Ltd".into(),
            document_text: "We collect your email address.".into(),
            document_type: DocumentType::PrivacyPolicy,
            ..Default::default()
        };
        let report = run_analysis(&analyzer, &request).await.unwrap();
        assert_eq!(report.result.score, 90);
        assert_eq!(report.result.risk_tier, RiskTier::Low);
        assert!(Uuid::parse_str(&report.analysis_id).is_ok());
        assert!(chrono::DateTime::parse_from_rfc3339(&report.timestamp).is_ok());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["companyName"], "Acme Ltd");
        assert_eq!(json["documentType"], "privacy_policy");
        assert_eq!(json["result"]["score"], 90);
        assert!(json["processingTimeMs"].is_u64());
    }

    #[tokio::test]
    async fn empty_document_is_an_error() {
        let request = AnalysisRequest {
            company_name: "Acme Ltd".into(),
            document_text: "   ".into(),
            ..Default::default()
        };
        assert!(run_analysis(&analyzer("{}"), &request).await.is_err());
    }

    #[tokio::test]
    async fn captured_response_is_assessed() {
        let analyzer = analyzer(
            r#"{"compliance_score": 40, "gaps": [{"title": "No officer appointed", "description": "Missing designated contact", "severity": "critical"}]}"#,
        );
        let raw = r#"Here you go: {"compliance_score": 40, "gaps": [{"title": "No officer appointed", "description": "Missing designated contact", "severity": "critical"}]}"#;
        let report = run_assessment(&analyzer, "Acme Ltd".into(), raw).await;
        assert_eq!(report.result.score, 40);
        assert_eq!(report.result.gaps.len(), 1);
        assert_eq!(report.result.fixes.len(), 1);
        assert_eq!(report.result.fixes[0].gap_id, report.result.gaps[0].id);
        assert!(report.document_type.is_none());
    }

    #[tokio::test]
    async fn prose_response_is_degraded_not_fatal() {
        let report = run_assessment(
            &analyzer("no structure here either"),
            "Acme Ltd".into(),
            "I could not complete the analysis. Compliance score: 35",
        )
        .await;
        assert!(report.result.degraded);
        assert_eq!(report.result.score, 35);
        assert!(
            report
                .result
                .fixes
                .iter()
                .all(|f| f.source == FixSource::Fallback)
        );
    }
}
