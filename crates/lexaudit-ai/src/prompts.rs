//! Prompt construction for the analysis and fix enrichment calls.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use lexaudit_core::Gap;

/// Documents longer than this are cut before prompting.
pub const MAX_DOCUMENT_CHARS: usize = 15_000;

/// Above this estimated prompt size the abbreviated template is used.
pub const MAX_PROMPT_TOKENS: usize = 100_000;

/// Kind of legal document under assessment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    #[default]
    PrivacyPolicy,
    TermsOfService,
    ConsentForm,
    DataAgreement,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrivacyPolicy => "privacy_policy",
            Self::TermsOfService => "terms_of_service",
            Self::ConsentForm => "consent_form",
            Self::DataAgreement => "data_agreement",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "privacy_policy" => Ok(Self::PrivacyPolicy),
            "terms_of_service" => Ok(Self::TermsOfService),
            "consent_form" => Ok(Self::ConsentForm),
            "data_agreement" => Ok(Self::DataAgreement),
            other => Err(format!(
                "unknown document type {other:?} (expected privacy_policy, terms_of_service, consent_form or data_agreement)"
            )),
        }
    }
}

/// One analysis job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub company_name: String,
    pub document_text: String,
    #[serde(default)]
    pub document_type: DocumentType,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub company_size: Option<String>,
    #[serde(default)]
    pub target_users: Option<String>,
    #[serde(default)]
    pub processing_scope: Option<String>,
}

/// Analysis prompt templates. Placeholders are `{company_name}`,
/// `{industry}`, `{document_type}`, `{company_size}`, `{target_users}`,
/// `{processing_scope}` and `{document_text}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplates {
    pub analysis: String,
    pub abbreviated: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            analysis: ANALYSIS_TEMPLATE.to_string(),
            abbreviated: ABBREVIATED_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplates {
    /// Built-in templates with the full analysis template replaced.
    pub fn with_analysis(template: impl Into<String>) -> Self {
        Self {
            analysis: template.into(),
            ..Self::default()
        }
    }

    /// Build the primary analysis prompt for `request`.
    pub fn analysis_prompt(&self, request: &AnalysisRequest) -> String {
        let document = truncate_document(&request.document_text);

        let estimated_tokens = (self.analysis.chars().count() + document.chars().count()) / 4;
        let template = if estimated_tokens > MAX_PROMPT_TOKENS {
            warn!(estimated_tokens, "prompt too large, using abbreviated template");
            &self.abbreviated
        } else {
            &self.analysis
        };

        fill(template, request, document)
    }
}

/// Cut `text` to [`MAX_DOCUMENT_CHARS`] characters.
pub fn truncate_document(text: &str) -> &str {
    match text.char_indices().nth(MAX_DOCUMENT_CHARS) {
        Some((cut, _)) => {
            warn!(
                from = text.chars().count(),
                to = MAX_DOCUMENT_CHARS,
                "document truncated"
            );
            &text[..cut]
        }
        None => text,
    }
}

fn fill(template: &str, request: &AnalysisRequest, document: &str) -> String {
    let or = |value: &Option<String>, default: &str| -> String {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(default)
            .to_string()
    };
    let replacements = [
        ("{company_name}", request.company_name.trim().to_string()),
        ("{industry}", or(&request.industry, "Unknown")),
        ("{document_type}", request.document_type.as_str().to_string()),
        ("{company_size}", or(&request.company_size, "Unknown")),
        ("{target_users}", or(&request.target_users, "General Public")),
        ("{processing_scope}", or(&request.processing_scope, "Standard")),
    ];

    let mut prompt = template.to_string();
    for (placeholder, value) in &replacements {
        prompt = prompt.replace(placeholder, value);
    }
    // Last, so document contents are never treated as placeholders.
    let prompt = prompt.replace("{document_text}", document);
    info!(chars = prompt.len(), "built analysis prompt");
    prompt
}

/// Prompt asking for a remediation clause for one gap.
pub fn fix_prompt(gap: &Gap) -> String {
    let articles = if gap.articles.is_empty() {
        "Not specified".to_string()
    } else {
        gap.articles.join(", ")
    };
    format!(
        r#"You are a Nigerian data protection lawyer drafting compliant privacy policy text.

COMPLIANCE GAP:
Title: {title}
Description: {description}
Violated Articles: {articles}
Severity: {severity}
Recommendation: {recommendation}

TASK: Draft a policy clause that closes this gap under the Nigeria Data Protection Act 2023.

The clause must:
1. Directly address the gap in plain language
2. Cite the relevant NDPA sections
3. Come with practical implementation steps a non-lawyer can follow

Respond with ONLY this JSON object:
{{
  "suggested_text": "Compliant clause with NDPA references",
  "implementation_steps": ["Step with responsible party", "Step with timeline", "Step with verification"],
  "effort_level": "low/medium/high",
  "estimated_timeline": "X days/weeks/months",
  "responsible_parties": ["Role 1", "Role 2"],
  "success_criteria": "How to confirm the fix works",
  "current_text": "Problematic text from the policy, if any"
}}"#,
        title = gap.title,
        description = gap.description,
        severity = gap.severity.as_str(),
        recommendation = gap.recommendation,
    )
}

const ANALYSIS_TEMPLATE: &str = r#"You are a senior Nigerian data protection lawyer. Audit the document below against the Nigeria Data Protection Act 2023 (NDPA) and report every compliance gap.

COMPANY: {company_name}
INDUSTRY: {industry}
DOCUMENT TYPE: {document_type}
COMPANY SIZE: {company_size}
TARGET USERS: {target_users}
PROCESSING SCOPE: {processing_scope}

DOCUMENT TEXT:
{document_text}

REVIEW CHECKLIST:
1. Principles (S. 24): lawfulness, purpose limitation, minimization, storage limitation, accuracy, security, accountability
2. Lawful basis (S. 25) and consent quality (S. 26), including children's consent (S. 26(9))
3. Sensitive data (S. 27) and children's data (S. 28)
4. Security of processing (S. 31-32) and impact assessments (S. 33)
5. Data subject rights (S. 34-39): information, access, portability, rectification, erasure, restriction, objection, automated decisions
6. Breach notification (S. 40-41): 72 hours to the NDPC, prompt notice to data subjects
7. Cross-border transfers (S. 43-46)
8. Records of processing (S. 47) and the Data Protection Officer (S. 5-6)
9. Sector rules that apply to the stated industry

SCORING:
- Start from 100; the maximum is 120 including certification bonuses
- Critical gaps: -25 to -40 each (no DPO, no breach procedure, unlawful processing)
- High gaps: -15 to -25 each (missing rights, weak consent, no retention periods)
- Medium gaps: -8 to -15 each (partial coverage, vague language)
- Low gaps: -2 to -8 each (best-practice deviations)

RESPOND IN THIS JSON FORMAT:
{
  "compliance_score": 0-120,
  "risk_level": "low/medium/high/critical",
  "summary": "One-sentence verdict",
  "gaps": [
    {
      "gap_id": "gap_001",
      "title": "Short title",
      "description": "What is missing and which NDPA duty it breaches",
      "severity": "critical/high/medium/low",
      "ndpr_articles": ["S. 25", "S. 26"],
      "impact": {
        "regulatory": "Enforcement likelihood and penalty range",
        "operational": "Effect on processing",
        "reputational": "Effect on trust",
        "financial": "Estimated NGN exposure"
      },
      "recommendation": "Concrete remediation with a timeline"
    }
  ],
  "executive_summary": {
    "overall_assessment": "Narrative assessment",
    "key_strengths": ["Strength"],
    "critical_weaknesses": ["Weakness and its risk"],
    "immediate_actions": ["Action (0-7 days)"],
    "compliance_roadmap": "Phased plan",
    "estimated_total_remediation_cost": "NGN X - Y",
    "estimated_compliance_timeline": "X months"
  },
  "legal_references": [
    {
      "regulation": "NDPA 2023",
      "article": "S. 25",
      "title": "Section title",
      "summary": "Plain-language explanation",
      "relevance": "Why it matters for the gaps found"
    }
  ]
}

Return ONLY valid JSON, no other text."#;

const ABBREVIATED_TEMPLATE: &str = r#"You are a Nigerian data protection expert. Analyze this document for NDPA 2023 compliance.

COMPANY: {company_name}
INDUSTRY: {industry}
DOCUMENT TYPE: {document_type}

DOCUMENT TEXT:
{document_text}

FOCUS: data subject rights (S. 34-39), lawful basis and consent (S. 25-26), security (S. 31-33), DPO (S. 5-6), breach notification (S. 40-41), sensitive and children's data (S. 27-28), cross-border transfers (S. 43-46).

RESPOND IN JSON:
{
  "compliance_score": 0-120,
  "risk_level": "low/medium/high/critical",
  "gaps": [{"gap_id": "gap_001", "title": "", "description": "", "severity": "critical/high/medium/low", "ndpr_articles": [], "impact": "", "recommendation": ""}],
  "executive_summary": {"overall_assessment": "", "key_strengths": [], "critical_weaknesses": [], "immediate_actions": [], "compliance_roadmap": "", "estimated_total_remediation_cost": "", "estimated_compliance_timeline": ""},
  "legal_references": [{"regulation": "NDPA 2023", "article": "", "title": "", "summary": "", "relevance": ""}]
}

Return ONLY valid JSON."#;

#[cfg(test)]
mod tests {
    use super::*;
    use lexaudit_core::Severity;

    fn request(text: &str) -> AnalysisRequest {
        AnalysisRequest {
            company_name: "Paystack Ltd".into(),
            document_text: text.into(),
            document_type: DocumentType::PrivacyPolicy,
            industry: Some("Fintech".into()),
            ..Default::default()
        }
    }

    #[test]
    fn analysis_prompt_fills_placeholders() {
        let prompt = PromptTemplates::default().analysis_prompt(&request("We collect emails."));
        assert!(prompt.contains("COMPANY: Paystack Ltd"));
        assert!(prompt.contains("INDUSTRY: Fintech"));
        assert!(prompt.contains("DOCUMENT TYPE: privacy_policy"));
        assert!(prompt.contains("COMPANY SIZE: Unknown"));
        assert!(prompt.contains("TARGET USERS: General Public"));
        assert!(prompt.contains("We collect emails."));
        assert!(!prompt.contains("{document_text}"));
    }

    #[test]
    fn document_placeholders_are_not_expanded() {
        let prompt = PromptTemplates::default().analysis_prompt(&request("Contact {company_name}."));
        assert!(prompt.contains("Contact {company_name}."));
    }

    #[test]
    fn long_documents_are_truncated_on_char_boundaries() {
        let text = "é".repeat(MAX_DOCUMENT_CHARS + 10);
        let cut = truncate_document(&text);
        assert_eq!(cut.chars().count(), MAX_DOCUMENT_CHARS);
        assert_eq!(truncate_document("short"), "short");
    }

    #[test]
    fn oversized_template_switches_to_abbreviated() {
        let huge = format!("{}\n{{document_text}}", "x".repeat(MAX_PROMPT_TOKENS * 4 + 4));
        let templates = PromptTemplates::with_analysis(huge);
        let prompt = templates.analysis_prompt(&request("policy"));
        assert!(prompt.starts_with("You are a Nigerian data protection expert."));
        assert!(prompt.contains("policy"));
    }

    #[test]
    fn override_template_is_used() {
        let templates = PromptTemplates::with_analysis("Audit {company_name}: {document_text}");
        assert_eq!(
            templates.analysis_prompt(&request("text")),
            "Audit Paystack Ltd: text"
        );
    }

    #[test]
    fn document_type_parses_loosely() {
        assert_eq!(
            "Terms-Of-Service".parse::<DocumentType>(),
            Ok(DocumentType::TermsOfService)
        );
        assert_eq!(
            "consent_form".parse::<DocumentType>(),
            Ok(DocumentType::ConsentForm)
        );
        assert!("memo".parse::<DocumentType>().is_err());
    }

    #[test]
    fn fix_prompt_describes_the_gap() {
        let gap = Gap {
            id: "gap_000".into(),
            title: "No officer appointed".into(),
            description: "Missing designated contact".into(),
            severity: Severity::Critical,
            articles: vec![],
            impact: "Fines".into(),
            recommendation: "Appoint a DPO".into(),
        };
        let prompt = fix_prompt(&gap);
        assert!(prompt.contains("Title: No officer appointed"));
        assert!(prompt.contains("Violated Articles: Not specified"));
        assert!(prompt.contains("Severity: critical"));
        assert!(prompt.contains("\"suggested_text\""));
    }
}
