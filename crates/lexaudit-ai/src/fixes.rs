//! Per-gap remediation enrichment.
//!
//! Each selected gap gets one upstream call. A failing call (transport,
//! timeout, or an unparseable answer) only affects its own gap, which then
//! receives a deterministic fix built from the gap itself.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use lexaudit_core::{EffortLevel, Fix, FixSource, Gap};

use crate::error::FixFailure;
use crate::extract::extract;
use crate::generate::{GenerationParams, TextGenerator};
use crate::normalize::{
    self, CURRENT_TEXT, EFFORT_LEVEL, ESTIMATED_TIMELINE, IMPLEMENTATION_STEPS,
    RESPONSIBLE_PARTIES, SUCCESS_CRITERIA, SUGGESTED_TEXT, scalar_text, string_list,
};
use crate::prompts::fix_prompt;

pub const FALLBACK_STEPS: [&str; 5] = [
    "Review NDPA requirements for this area",
    "Draft compliant policy language",
    "Have legal counsel review changes",
    "Update privacy policy document",
    "Communicate changes to users if required",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixOptions {
    /// Upper bound on fixes per assessment.
    pub max_fixes: usize,
    /// Enrichment calls in flight at once.
    pub concurrency: usize,
    /// Per-call deadline.
    pub timeout: Duration,
    pub params: GenerationParams,
}

impl Default for FixOptions {
    fn default() -> Self {
        Self {
            max_fixes: 10,
            concurrency: 4,
            timeout: Duration::from_secs(60),
            params: GenerationParams::new(0.4, 2048),
        }
    }
}

pub struct FixOrchestrator {
    generator: Arc<dyn TextGenerator>,
    options: FixOptions,
}

impl FixOrchestrator {
    pub fn new(generator: Arc<dyn TextGenerator>, options: FixOptions) -> Self {
        Self { generator, options }
    }

    /// One fix per selected gap, in selection order. Never returns fewer
    /// fixes than gaps selected.
    pub async fn generate_fixes(&self, gaps: &[Gap]) -> Vec<Fix> {
        let selected = select_priority_gaps(gaps, self.options.max_fixes);
        if selected.is_empty() {
            return Vec::new();
        }
        info!(
            selected = selected.len(),
            total = gaps.len(),
            concurrency = self.options.concurrency,
            "generating fixes"
        );

        let mut slots: Vec<Option<Fix>> = vec![None; selected.len()];
        let mut completed = futures::stream::iter(selected.iter().copied().enumerate())
            .map(|(slot, gap)| async move { (slot, self.generate_fix(gap).await) })
            .buffer_unordered(self.options.concurrency.max(1));

        while let Some((slot, fix)) = completed.next().await {
            slots[slot] = Some(fix);
        }

        let fixes: Vec<Fix> = slots
            .into_iter()
            .zip(&selected)
            .map(|(fix, gap)| fix.unwrap_or_else(|| fallback_fix(gap)))
            .collect();
        let fallbacks = fixes.iter().filter(|f| f.source == FixSource::Fallback).count();
        info!(fixes = fixes.len(), fallbacks, "fix generation complete");
        fixes
    }

    /// Enrich a single gap, falling back on any failure.
    pub async fn generate_fix(&self, gap: &Gap) -> Fix {
        match self.try_generate(gap).await {
            Ok(fix) => {
                debug!(gap_id = %gap.id, "generated fix");
                fix
            }
            Err(err) => {
                warn!(gap_id = %gap.id, error = %err, "fix generation failed, using fallback");
                fallback_fix(gap)
            }
        }
    }

    async fn try_generate(&self, gap: &Gap) -> Result<Fix, FixFailure> {
        let prompt = fix_prompt(gap);
        let text = tokio::time::timeout(
            self.options.timeout,
            self.generator.generate(&prompt, self.options.params),
        )
        .await
        .map_err(|_| FixFailure::Timeout(self.options.timeout))??;

        let extraction = extract(&text);
        if extraction.is_degraded() {
            return Err(FixFailure::Unparseable("no structured data in fix response"));
        }
        let fields = normalize::normalize_fix(extraction.document)?;
        Ok(build_fix(gap, &fields))
    }
}

/// Up to `max` gaps, most severe first. Equal severities keep input order.
pub fn select_priority_gaps(gaps: &[Gap], max: usize) -> Vec<&Gap> {
    let mut selected: Vec<&Gap> = gaps.iter().collect();
    selected.sort_by_key(|gap| gap.severity.priority_rank());
    selected.truncate(max);
    selected
}

/// Deterministic fix built only from the gap's own fields.
pub fn fallback_fix(gap: &Gap) -> Fix {
    let mut suggested_text = format!(
        "Update your privacy policy to address: {}",
        gap.description
    );
    if !gap.articles.is_empty() {
        suggested_text.push_str(&format!(
            "\n\nRefer to NDPA {} for specific requirements.",
            gap.articles.join(", ")
        ));
    }

    Fix {
        gap_id: gap.id.clone(),
        title: format!("Address: {}", gap.title),
        suggested_text,
        implementation_steps: FALLBACK_STEPS.map(String::from).to_vec(),
        effort_level: EffortLevel::Medium,
        current_text: None,
        timeline: None,
        responsible_parties: Vec::new(),
        success_criteria: None,
        source: FixSource::Fallback,
    }
}

fn build_fix(gap: &Gap, fields: &Map<String, Value>) -> Fix {
    let text = |key: &str| {
        fields
            .get(key)
            .and_then(scalar_text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };
    let list = |key: &str| fields.get(key).cloned().map(string_list).unwrap_or_default();

    let success_criteria = text(SUCCESS_CRITERIA).or_else(|| {
        let items = list(SUCCESS_CRITERIA);
        (!items.is_empty()).then(|| items.join("; "))
    });

    Fix {
        gap_id: gap.id.clone(),
        title: format!("Fix: {}", gap.title),
        suggested_text: text(SUGGESTED_TEXT)
            .unwrap_or_else(|| normalize::DEFAULT_SUGGESTED_TEXT.to_string()),
        implementation_steps: list(IMPLEMENTATION_STEPS),
        effort_level: fields
            .get(EFFORT_LEVEL)
            .and_then(Value::as_str)
            .and_then(EffortLevel::parse)
            .unwrap_or(EffortLevel::Medium),
        current_text: text(CURRENT_TEXT),
        timeline: text(ESTIMATED_TIMELINE).or_else(|| text("timeline")),
        responsible_parties: list(RESPONSIBLE_PARTIES),
        success_criteria,
        source: FixSource::Generated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use lexaudit_core::Severity;

    use crate::error::UpstreamError;
    use crate::testing::{Reply, ScriptedGenerator};

    const FIX_JSON: &str = r#"{"suggested_text": "We have appointed a DPO.", "implementation_steps": ["Hire", "Publish contact"], "effort_level": "High (3 weeks)", "estimated_timeline": "3 weeks", "responsible_parties": ["HR"], "success_criteria": ["DPO named", "Contact live"]}"#;

    fn gap(id: &str, title: &str, severity: Severity) -> Gap {
        Gap {
            id: id.into(),
            title: title.into(),
            description: format!("{title} description"),
            severity,
            articles: vec!["S. 5".into()],
            impact: "Fines".into(),
            recommendation: "Fix it".into(),
        }
    }

    fn orchestrator(generator: ScriptedGenerator) -> (FixOrchestrator, Arc<ScriptedGenerator>) {
        let generator = Arc::new(generator);
        let orchestrator = FixOrchestrator::new(generator.clone(), FixOptions::default());
        (orchestrator, generator)
    }

    fn ids(fixes: &[Fix]) -> Vec<&str> {
        fixes.iter().map(|f| f.gap_id.as_str()).collect()
    }

    #[test]
    fn selection_is_stable_by_severity() {
        let gaps = vec![
            gap("a", "A", Severity::Low),
            gap("b", "B", Severity::Critical),
            gap("c", "C", Severity::Medium),
            gap("d", "D", Severity::Critical),
            gap("e", "E", Severity::High),
        ];
        let selected: Vec<&str> = select_priority_gaps(&gaps, 4)
            .iter()
            .map(|g| g.id.as_str())
            .collect();
        assert_eq!(selected, vec!["b", "d", "e", "c"]);
    }

    #[test]
    fn fallback_uses_only_gap_fields() {
        let mut g = gap("gap_000", "No officer appointed", Severity::Critical);
        g.description = "Missing designated contact".into();
        g.articles.clear();
        let fix = fallback_fix(&g);
        assert_eq!(fix.gap_id, "gap_000");
        assert_eq!(fix.title, "Address: No officer appointed");
        assert_eq!(
            fix.suggested_text,
            "Update your privacy policy to address: Missing designated contact"
        );
        assert_eq!(fix.implementation_steps.len(), 5);
        assert_eq!(fix.effort_level, EffortLevel::Medium);
        assert_eq!(fix.source, FixSource::Fallback);
    }

    #[test]
    fn fallback_cites_articles_when_present() {
        let fix = fallback_fix(&gap("g", "T", Severity::High));
        assert!(fix.suggested_text.ends_with("Refer to NDPA S. 5 for specific requirements."));
    }

    #[tokio::test]
    async fn generated_fix_reads_response_fields() {
        let (orchestrator, generator) = orchestrator(ScriptedGenerator::always(FIX_JSON));
        let fix = orchestrator
            .generate_fix(&gap("gap_dpo", "No DPO", Severity::Critical))
            .await;
        assert_eq!(fix.source, FixSource::Generated);
        assert_eq!(fix.title, "Fix: No DPO");
        assert_eq!(fix.suggested_text, "We have appointed a DPO.");
        assert_eq!(fix.implementation_steps, vec!["Hire", "Publish contact"]);
        assert_eq!(fix.effort_level, EffortLevel::High);
        assert_eq!(fix.timeline.as_deref(), Some("3 weeks"));
        assert_eq!(fix.responsible_parties, vec!["HR"]);
        assert_eq!(fix.success_criteria.as_deref(), Some("DPO named; Contact live"));
        assert_eq!(generator.temperatures(), vec![0.4]);
    }

    #[tokio::test]
    async fn fenced_fix_with_missing_fields_is_defaulted() {
        let (orchestrator, _) =
            orchestrator(ScriptedGenerator::always("```json\n{\"effort_level\": \"extreme\"}\n```"));
        let fix = orchestrator.generate_fix(&gap("g", "T", Severity::Low)).await;
        assert_eq!(fix.source, FixSource::Generated);
        assert_eq!(fix.suggested_text, normalize::DEFAULT_SUGGESTED_TEXT);
        assert_eq!(
            fix.implementation_steps,
            vec!["Review gap details", "Update policy text", "Verify compliance"]
        );
        assert_eq!(fix.effort_level, EffortLevel::Medium);
    }

    #[tokio::test]
    async fn prose_response_counts_as_failure() {
        let (orchestrator, _) =
            orchestrator(ScriptedGenerator::always("Sorry, I can't draft that clause."));
        let fix = orchestrator.generate_fix(&gap("g", "T", Severity::Low)).await;
        assert_eq!(fix.source, FixSource::Fallback);
    }

    #[tokio::test]
    async fn non_object_response_counts_as_failure() {
        let (orchestrator, _) = orchestrator(ScriptedGenerator::always("[\"step one\"]"));
        let fix = orchestrator.generate_fix(&gap("g", "T", Severity::Low)).await;
        assert_eq!(fix.source, FixSource::Fallback);
    }

    #[tokio::test]
    async fn every_call_failing_still_yields_ten_fixes() {
        let gaps: Vec<Gap> = (0..12)
            .map(|i| gap(&format!("gap_{i:03}"), "T", Severity::Medium))
            .collect();
        let (orchestrator, generator) = orchestrator(ScriptedGenerator::failing());
        let fixes = orchestrator.generate_fixes(&gaps).await;
        assert_eq!(fixes.len(), 10);
        assert!(fixes.iter().all(|f| f.source == FixSource::Fallback));
        assert_eq!(ids(&fixes)[..3], ["gap_000", "gap_001", "gap_002"]);
        assert_eq!(generator.calls(), 10);
    }

    #[tokio::test]
    async fn no_gaps_no_calls() {
        let (orchestrator, generator) = orchestrator(ScriptedGenerator::always(FIX_JSON));
        assert!(orchestrator.generate_fixes(&[]).await.is_empty());
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn output_order_ignores_completion_order() {
        let gaps = vec![
            gap("slow", "Slow", Severity::Critical),
            gap("low", "Low", Severity::Low),
            gap("fast", "Fast", Severity::Critical),
        ];
        let (orchestrator, _) = orchestrator(ScriptedGenerator::new(|prompt, _| {
            let delay = if prompt.contains("Title: Slow") { 30 } else { 1 };
            Reply::Delayed(Duration::from_secs(delay), FIX_JSON.into())
        }));
        let fixes = orchestrator.generate_fixes(&gaps).await;
        assert_eq!(ids(&fixes), vec!["slow", "fast", "low"]);
        assert!(fixes.iter().all(|f| f.source == FixSource::Generated));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_call_times_out_locally() {
        let gaps = vec![
            gap("hangs", "Hangs", Severity::Critical),
            gap("works", "Works", Severity::High),
        ];
        let (orchestrator, _) = orchestrator(ScriptedGenerator::new(|prompt, _| {
            if prompt.contains("Title: Hangs") {
                Reply::Hang
            } else {
                Reply::Text(FIX_JSON.into())
            }
        }));
        let started = tokio::time::Instant::now();
        let fixes = orchestrator.generate_fixes(&gaps).await;
        assert_eq!(ids(&fixes), vec!["hangs", "works"]);
        assert_eq!(fixes[0].source, FixSource::Fallback);
        assert_eq!(fixes[1].source, FixSource::Generated);
        assert!(started.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn quota_error_is_contained() {
        let gaps = vec![gap("a", "A", Severity::High), gap("b", "B", Severity::High)];
        let (orchestrator, _) = orchestrator(ScriptedGenerator::new(|prompt, _| {
            if prompt.contains("Title: A") {
                Reply::Fail(UpstreamError::QuotaExceeded("rpm".into()))
            } else {
                Reply::Text(FIX_JSON.into())
            }
        }));
        let fixes = orchestrator.generate_fixes(&gaps).await;
        assert_eq!(fixes[0].source, FixSource::Fallback);
        assert_eq!(fixes[1].source, FixSource::Generated);
    }

    /// Counts calls in flight to check the concurrency bound.
    struct Gauge {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl TextGenerator for Gauge {
        async fn generate(
            &self,
            _prompt: &str,
            _params: GenerationParams,
        ) -> Result<String, UpstreamError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(FIX_JSON.into())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_is_bounded() {
        let gauge = Arc::new(Gauge {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let options = FixOptions {
            concurrency: 2,
            ..FixOptions::default()
        };
        let orchestrator = FixOrchestrator::new(gauge.clone(), options);
        let gaps: Vec<Gap> = (0..6)
            .map(|i| gap(&format!("g{i}"), "T", Severity::High))
            .collect();
        let fixes = orchestrator.generate_fixes(&gaps).await;
        assert_eq!(fixes.len(), 6);
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 2);
    }
}
