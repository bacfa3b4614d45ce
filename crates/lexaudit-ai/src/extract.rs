//! Best-effort extraction of a JSON tree from raw upstream text.
//!
//! Strategies run from strictest to loosest and the first one that parses
//! wins. The last strategy is the heuristic scraper in [`crate::fallback`],
//! which cannot fail, so [`extract`] always returns a document.

use serde_json::Value;
use tracing::{debug, warn};

use crate::fallback;
use crate::repair::{matching_close, repair, strip_comments};

/// Which strategy produced the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    Direct,
    Fenced,
    BalancedScope,
    LineReconstruction,
    /// Heuristic field scraping; the result is degraded.
    TextFallback,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Fenced => "fenced",
            Self::BalancedScope => "balanced_scope",
            Self::LineReconstruction => "line_reconstruction",
            Self::TextFallback => "text_fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub document: Value,
    pub method: ExtractionMethod,
}

impl Extraction {
    pub fn is_degraded(&self) -> bool {
        self.method == ExtractionMethod::TextFallback
    }
}

/// Extract a document from `text`. Never fails.
pub fn extract(text: &str) -> Extraction {
    let strategies: [(ExtractionMethod, fn(&str) -> Option<Value>); 4] = [
        (ExtractionMethod::Direct, parse_direct),
        (ExtractionMethod::Fenced, parse_fenced),
        (ExtractionMethod::BalancedScope, parse_balanced_scope),
        (ExtractionMethod::LineReconstruction, parse_reconstructed_lines),
    ];

    for (method, strategy) in strategies {
        if let Some(document) = strategy(text) {
            debug!(method = method.as_str(), "extracted document");
            return Extraction { document, method };
        }
    }

    warn!(chars = text.len(), "no structured data found, scraping fields from text");
    Extraction {
        document: fallback::scrape(text),
        method: ExtractionMethod::TextFallback,
    }
}

fn parse(text: &str) -> Option<Value> {
    serde_json::from_str(text.trim()).ok()
}

fn parse_direct(text: &str) -> Option<Value> {
    parse(text)
}

/// Contents of the first fenced block. A language tag directly after the
/// opening fence is skipped; a missing closing fence runs to the end.
fn parse_fenced(text: &str) -> Option<Value> {
    const FENCE: &str = "```";
    let open = text.find(FENCE)? + FENCE.len();
    let body = &text[open..];
    let tag_len = body
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(body.len());
    let body = &body[tag_len..];
    let body = match body.find(FENCE) {
        Some(close) => &body[..close],
        None => body,
    };
    parse(body)
}

/// First `{` through its balanced close (or the last `}`), repaired.
/// Comments are dropped first so braces inside them neither open nor close.
fn parse_balanced_scope(text: &str) -> Option<Value> {
    let text = strip_comments(text);
    let start = text.find('{')?;
    let end = matching_close(&text, start).or_else(|| text.rfind('}').filter(|&e| e > start))?;
    parse(&repair(&text[start..=end]))
}

/// Join the lines of the first brace-balanced block, starting at a line that
/// begins with `{`, and parse the result (repairing it if needed).
fn parse_reconstructed_lines(text: &str) -> Option<Value> {
    let lines = text.lines().map(str::trim).skip_while(|l| !l.starts_with('{'));
    let mut joined = Vec::new();
    let mut depth: i64 = 0;

    for line in lines {
        if line.is_empty() {
            continue;
        }
        depth += line.matches('{').count() as i64 - line.matches('}').count() as i64;
        joined.push(line);
        if depth <= 0 {
            break;
        }
    }

    if joined.is_empty() || depth != 0 {
        return None;
    }
    let candidate = joined.join(" ");
    parse(&candidate).or_else(|| parse(&repair(&candidate)))
}
