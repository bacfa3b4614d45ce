//! Static citation table for the Nigeria Data Protection Act 2023.
//!
//! Maps citation keys (`"S. 37"`, `"S. 24(1)(a)"`, legacy NDPR keys such as
//! `"2.1"`) to a human-readable title and a plain-language summary. The table
//! is built once, optionally overlaid from a JSON file, then shared read-only.

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

/// Canonical regulation name for the NDPA.
pub const NDPA_2023: &str = "NDPA 2023";

/// Summary used for keys without a table entry.
pub const UNKNOWN_SUMMARY: &str = "See Nigeria Data Protection Act 2023 for full details.";

#[derive(Error, Debug)]
pub enum CitationError {
    #[error("citation overrides are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("citation override for {0:?} has an empty key")]
    EmptyKey(String),
}

/// One table entry. Either field may be absent; lookups fall back to
/// placeholder text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CitationEntry {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Read-only lookup from citation key to [`CitationEntry`].
#[derive(Debug, Clone, Default)]
pub struct CitationTable {
    entries: HashMap<String, CitationEntry>,
}

// ── Built-in data ──

const TITLES: &[(&str, &str)] = &[
    // Principles
    ("S. 24", "Data Protection Principles"),
    ("S. 24(1)(a)", "Lawfulness, Fairness and Transparency"),
    ("S. 24(1)(b)", "Purpose Limitation"),
    ("S. 24(1)(c)", "Data Minimization"),
    ("S. 24(1)(d)", "Storage Limitation"),
    ("S. 24(1)(e)", "Accuracy"),
    ("S. 24(1)(f)", "Integrity and Confidentiality"),
    ("S. 24(1)(g)", "Accountability"),
    // Lawful basis and consent
    ("S. 25", "Lawful Basis for Processing"),
    ("S. 25(1)(a)", "Lawful Basis - Consent"),
    ("S. 25(1)(b)", "Lawful Basis - Contract"),
    ("S. 25(1)(c)", "Lawful Basis - Legal Obligation"),
    ("S. 25(1)(d)", "Lawful Basis - Vital Interest"),
    ("S. 25(1)(e)", "Lawful Basis - Public Interest"),
    ("S. 25(1)(f)", "Lawful Basis - Legitimate Interest"),
    ("S. 26", "Consent Requirements"),
    ("S. 26(9)", "Children's Consent"),
    // Special data
    ("S. 27", "Special Category Data"),
    ("S. 28", "Children's Data Protection"),
    // Security
    ("S. 31", "Security of Processing"),
    ("S. 32", "Security Measures"),
    ("S. 33", "Data Protection Impact Assessment (DPIA)"),
    // Data subject rights
    ("S. 34", "Right to Information"),
    ("S. 35", "Right of Access"),
    ("S. 35(3)", "Right to Data Portability"),
    ("S. 36", "Right to Rectification"),
    ("S. 37", "Right to Erasure (Right to be Forgotten)"),
    ("S. 38", "Right to Restriction of Processing"),
    ("S. 39", "Right to Object"),
    ("S. 39(4)", "Right Not to be Subject to Automated Decision-Making"),
    // Breach
    ("S. 40", "Data Breach Notification to NDPC"),
    ("S. 41", "Data Breach Notification to Data Subjects"),
    // Transfers
    ("S. 43", "Cross-Border Data Transfers"),
    ("S. 44", "Transfer Safeguards"),
    ("S. 45", "Standard Data Protection Clauses"),
    ("S. 46", "Binding Corporate Rules"),
    // Records
    ("S. 47", "Records of Processing Activities (ROPA)"),
    // Data protection officer
    ("S. 5", "Data Protection Officer (DPO)"),
    ("S. 6", "DPO Duties and Responsibilities"),
    // Penalties
    ("S. 65", "Administrative Penalties"),
    ("S. 71", "Civil Liability and Compensation"),
    // NDPR 2019 numbering
    ("2.1", "Lawfulness and Consent (NDPR)"),
    ("2.2", "Purpose Limitation (NDPR)"),
    ("2.3", "Data Minimization (NDPR)"),
    ("2.4", "Storage Limitation (NDPR)"),
    ("2.5", "Rights of Data Subjects (NDPR)"),
    ("3.1", "Security of Processing (NDPR)"),
    ("4.1", "Data Breach Notification (NDPR)"),
];

const SUMMARIES: &[(&str, &str)] = &[
    (
        "S. 24(1)(a)",
        "Personal data must be processed lawfully, fairly, and transparently. People must be told clearly what is done with their data.",
    ),
    (
        "S. 24(1)(b)",
        "Use data only for the specific purpose it was collected for. Repurposing needs consent.",
    ),
    (
        "S. 24(1)(c)",
        "Collect only the data actually needed. Do not ask for unnecessary information.",
    ),
    (
        "S. 24(1)(d)",
        "Do not keep data longer than necessary. Delete or anonymize it when done.",
    ),
    (
        "S. 24(1)(e)",
        "Keep data accurate and up to date. Let people correct wrong information.",
    ),
    (
        "S. 24(1)(f)",
        "Protect data with appropriate security measures against breaches and unauthorized access.",
    ),
    (
        "S. 24(1)(g)",
        "The controller must be able to prove compliance through records and documentation.",
    ),
    (
        "S. 25(1)(a)",
        "Obtain clear consent before processing. Consent must be freely given, specific, informed, and unambiguous.",
    ),
    (
        "S. 26",
        "Consent must be easy to give and to withdraw. No pre-ticked boxes. The burden of proof is on the controller.",
    ),
    (
        "S. 26(9)",
        "Children under 18 need parental or guardian consent, with reasonable age verification.",
    ),
    (
        "S. 27",
        "Sensitive data (health, biometrics, religion and similar) needs explicit consent or a specific legal basis.",
    ),
    (
        "S. 28",
        "Children's data needs special protection. The best interests of the child are paramount.",
    ),
    (
        "S. 31",
        "Implement appropriate technical and organizational security measures.",
    ),
    (
        "S. 33",
        "Conduct a Data Protection Impact Assessment for high-risk processing.",
    ),
    (
        "S. 34",
        "Give clear information about processing at the point of collection.",
    ),
    (
        "S. 35",
        "People may request a copy of their data. Respond within 30 days, free of charge for the first request.",
    ),
    (
        "S. 35(3)",
        "Provide data in a machine-readable format and enable direct transfer to another controller.",
    ),
    (
        "S. 36",
        "Let people correct inaccurate or incomplete data and notify recipients of corrections.",
    ),
    (
        "S. 37",
        "Delete data on request when consent is withdrawn, it is no longer needed, processing is unlawful, or the law requires it.",
    ),
    (
        "S. 38",
        "Restrict processing while accuracy is contested or legitimate grounds are being verified.",
    ),
    (
        "S. 39",
        "People may object to processing, especially direct marketing, and the objection must be honored.",
    ),
    (
        "S. 39(4)",
        "Do not make solely automated decisions with legal or similarly significant effects without human intervention.",
    ),
    (
        "S. 40",
        "Notify the NDPC within 72 hours of becoming aware of a breach that poses a risk.",
    ),
    (
        "S. 41",
        "Notify affected individuals without undue delay when a breach poses a high risk.",
    ),
    (
        "S. 43",
        "Do not transfer data outside Nigeria unless adequate protection is ensured.",
    ),
    (
        "S. 47",
        "Maintain written records of processing activities and make them available to the NDPC on request.",
    ),
    (
        "S. 5",
        "Appoint a Data Protection Officer. Mandatory for all controllers and processors.",
    ),
    (
        "S. 6",
        "The DPO monitors compliance, advises on obligations, and is the contact point for the NDPC.",
    ),
    (
        "S. 65",
        "Fines up to 2% of annual turnover or NGN 10M for violations, and 4% or NGN 25M for serious violations.",
    ),
    (
        "S. 71",
        "Data subjects can sue for compensation for damage caused by violations.",
    ),
    ("2.1", "Get clear permission before collecting personal data."),
    ("2.2", "Only use data for the reason it was collected."),
    ("2.3", "Only collect data that is actually needed."),
    ("2.4", "Delete data when it is no longer needed."),
    ("2.5", "People can access, correct, or delete their data."),
    ("3.1", "Keep data secure with proper protections."),
    ("4.1", "Report data breaches within 72 hours."),
];

impl CitationTable {
    /// The built-in NDPA 2023 table (plus NDPR 2019 legacy keys).
    pub fn builtin() -> Self {
        let mut entries: HashMap<String, CitationEntry> = HashMap::new();
        for &(key, title) in TITLES {
            entries.entry(key.to_string()).or_default().title = Some(title.to_string());
        }
        for &(key, summary) in SUMMARIES {
            entries.entry(key.to_string()).or_default().summary = Some(summary.to_string());
        }
        Self { entries }
    }

    /// Overlay entries from a JSON object of `key → {title?, summary?}`.
    ///
    /// Fields present in the overlay replace the existing ones; absent fields
    /// keep their current value. Returns the number of keys applied.
    pub fn merge_json(&mut self, json: &str) -> Result<usize, CitationError> {
        let overlay: HashMap<String, CitationEntry> = serde_json::from_str(json)?;
        let mut applied = 0;
        for (key, entry) in overlay {
            let key_trimmed = key.trim();
            if key_trimmed.is_empty() {
                return Err(CitationError::EmptyKey(key));
            }
            let slot = self.entries.entry(key_trimmed.to_string()).or_default();
            if entry.title.is_some() {
                slot.title = entry.title;
            }
            if entry.summary.is_some() {
                slot.summary = entry.summary;
            }
            applied += 1;
        }
        tracing::info!(applied, total = self.entries.len(), "merged citation overrides");
        Ok(applied)
    }

    /// Look up an entry by exact key, then by its canonical form
    /// (`"Section 37"` and `"s.37"` both resolve to `"S. 37"`).
    pub fn get(&self, key: &str) -> Option<&CitationEntry> {
        let key = key.trim();
        self.entries
            .get(key)
            .or_else(|| self.entries.get(&canonical_citation_key(key)))
    }

    /// Title for `key`, or `"NDPA Article <key>"` when unknown.
    pub fn title(&self, key: &str) -> String {
        self.get(key)
            .and_then(|e| e.title.clone())
            .unwrap_or_else(|| format!("NDPA Article {}", key.trim()))
    }

    /// Plain-language summary for `key`, or [`UNKNOWN_SUMMARY`] when unknown.
    pub fn summary(&self, key: &str) -> String {
        self.get(key)
            .and_then(|e| e.summary.clone())
            .unwrap_or_else(|| UNKNOWN_SUMMARY.to_string())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Rewrite section-style keys into the table's `"S. <n>"` form.
///
/// `"Section 24(1)(a)"`, `"s.24(1)(a)"` and `"S 24(1)(a)"` all become
/// `"S. 24(1)(a)"`. Keys that do not look like section references are
/// returned trimmed and otherwise unchanged.
pub fn canonical_citation_key(key: &str) -> String {
    let key = key.trim();
    let lower = key.to_ascii_lowercase();
    let rest = ["section", "sec.", "s."]
        .iter()
        .find_map(|prefix| lower.strip_prefix(prefix).map(|_| &key[prefix.len()..]))
        .or_else(|| {
            // Bare "S 24"
            let mut chars = lower.chars();
            match (chars.next(), chars.next()) {
                (Some('s'), Some(' ')) => Some(&key[1..]),
                _ => None,
            }
        });

    match rest {
        Some(rest) if rest.trim_start().starts_with(|c: char| c.is_ascii_digit()) => {
            format!("S. {}", rest.trim_start())
        }
        _ => key.to_string(),
    }
}

/// Map regulation names that denote the NDPA onto [`NDPA_2023`]. Blank names
/// also map to it. Other regulations are returned trimmed.
pub fn canonical_regulation(name: &str) -> String {
    let trimmed = name.trim();
    let lower = trimmed.to_ascii_lowercase();
    if trimmed.is_empty() || lower.contains("ndpa") || lower.contains("nigeria data protection act")
    {
        NDPA_2023.to_string()
    } else {
        trimmed.to_string()
    }
}
