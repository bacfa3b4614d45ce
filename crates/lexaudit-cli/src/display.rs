//! Human-readable cards for assessment reports and citation lookups.

use lexaudit_core::{CitationTable, Fix, FixSource, Gap, LegalReference, Severity};

use crate::report::AnalysisReport;

const MAX_LIST_ITEMS: usize = 10;

/// Severity sections, printed most urgent first.
const SEVERITY_ORDER: &[Severity] = &[
    Severity::Critical,
    Severity::High,
    Severity::Medium,
    Severity::Low,
];

// ── Public API ──

/// Print one analysis report as a vertical card.
pub fn print_assessment_card(report: &AnalysisReport) {
    let result = &report.result;

    println!("=== {} ===", report.company_name);
    println!("Analysis {}", report.analysis_id);
    println!();

    println!("Overview");
    field("score", format!("{}/120", result.score));
    field("risk tier", result.risk_tier.as_str());
    field("grade", result.grade.as_str());
    if let Some(document_type) = &report.document_type {
        field("document type", document_type);
    }
    field("processing time", format!("{} ms", report.processing_time_ms));
    field("timestamp", &report.timestamp);
    if result.degraded {
        field("recovery", "scraped from unstructured text");
    }
    field("summary", &result.summary);
    println!();

    println!("Gaps by Severity");
    let counts = &result.gaps_by_severity;
    field("critical", counts.critical);
    field("high", counts.high);
    field("medium", counts.medium);
    field("low", counts.low);
    println!();

    for &severity in SEVERITY_ORDER {
        print_gap_section(&result.gaps, severity);
    }
    print_fixes(&result.fixes);
    print_references(&result.references);

    let summary = &result.executive_summary;
    println!("Executive Summary");
    field("overall", &summary.overall_assessment);
    list("key strengths", &summary.key_strengths);
    list("critical weaknesses", &summary.critical_weaknesses);
    list("immediate actions", &summary.immediate_actions);
    field("roadmap", &summary.compliance_roadmap);
    field("remediation cost", &summary.estimated_total_remediation_cost);
    field("compliance timeline", &summary.estimated_compliance_timeline);
}

/// Print the table entry for one citation key.
pub fn print_citation(table: &CitationTable, key: &str) {
    let known = table.get(key).is_some();
    println!("=== {} ===", key.trim());
    field("title", table.title(key));
    field("summary", table.summary(key));
    if !known {
        field("note", "not in the citation table; showing defaults");
    }
}

// ── Sections ──

fn print_gap_section(gaps: &[Gap], severity: Severity) {
    let matching: Vec<&Gap> = gaps.iter().filter(|g| g.severity == severity).collect();
    if matching.is_empty() {
        return;
    }

    println!("{} Gaps ({})", capitalize(severity.as_str()), matching.len());
    for gap in matching {
        println!("  [{}] {}", gap.id, gap.title);
        println!("      {}", gap.description);
        if !gap.articles.is_empty() {
            println!("      articles: {}", gap.articles.join(", "));
        }
        println!("      impact: {}", gap.impact);
        println!("      recommendation: {}", gap.recommendation);
    }
    println!();
}

fn print_fixes(fixes: &[Fix]) {
    if fixes.is_empty() {
        return;
    }

    println!("Fixes ({})", fixes.len());
    for fix in fixes.iter().take(MAX_LIST_ITEMS) {
        println!(
            "  [{}] {} (effort: {}, {})",
            fix.gap_id,
            fix.title,
            fix.effort_level.as_str(),
            match fix.source {
                FixSource::Generated => "generated",
                FixSource::Fallback => "fallback",
            }
        );
        for line in fix.suggested_text.lines().filter(|l| !l.trim().is_empty()) {
            println!("      {line}");
        }
        for (i, step) in fix.implementation_steps.iter().enumerate() {
            println!("      {}. {step}", i + 1);
        }
        if let Some(timeline) = &fix.timeline {
            println!("      timeline: {timeline}");
        }
        if !fix.responsible_parties.is_empty() {
            println!("      owners: {}", fix.responsible_parties.join(", "));
        }
    }
    if fixes.len() > MAX_LIST_ITEMS {
        println!("    ... and {} more", fixes.len() - MAX_LIST_ITEMS);
    }
    println!();
}

fn print_references(references: &[LegalReference]) {
    if references.is_empty() {
        return;
    }

    println!("Legal References ({})", references.len());
    for reference in references {
        println!(
            "  {} {}: {}",
            reference.regulation, reference.article, reference.title
        );
        println!("      {}", reference.summary);
        println!("      {}", reference.relevance);
    }
    println!();
}

// ── Helpers ──

fn field(name: &str, value: impl std::fmt::Display) {
    println!("  {:<26} {}", name, value);
}

fn list(name: &str, items: &[String]) {
    if items.is_empty() {
        println!("  {:<26} (none)", name);
    } else {
        println!("  {:<26} {}", name, items.join("; "));
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
