//! Compliance score resolution and the score-derived classifications.
//!
//! Upstream scores are reported on a scale that tops out at 120 (a base of 100
//! plus certification bonuses), even where a 0–100 scale is advertised. The
//! clamp keeps the wider range because the grade thresholds rely on it.
//!
//! | score    | risk tier | grade        |
//! |----------|-----------|--------------|
//! | 95..=120 | low       | platinum     |
//! | 85..=94  | low       | gold         |
//! | 70..=84  | medium    | silver       |
//! | 50..=69  | high      | bronze       |
//! | 30..=49  | critical  | critical     |
//! | 0..=29   | critical  | catastrophic |

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MIN_SCORE: u32 = 0;
pub const MAX_SCORE: u32 = 120;
/// Score used when the upstream value is missing or not a number.
pub const DEFAULT_SCORE: u32 = 50;

/// Resolve a raw upstream score into `0..=120`.
///
/// Numbers are truncated toward zero and clamped. Anything else (numeric
/// strings included) resolves to [`DEFAULT_SCORE`]. Total and idempotent.
pub fn resolve_score(raw: &Value) -> u32 {
    let Some(n) = raw.as_f64() else {
        tracing::warn!(raw = %raw, "non-numeric compliance score, using default");
        return DEFAULT_SCORE;
    };

    let n = n.trunc();
    if n < MIN_SCORE as f64 {
        tracing::warn!(score = n, "compliance score below range, clamping");
        MIN_SCORE
    } else if n > MAX_SCORE as f64 {
        tracing::warn!(score = n, "compliance score above range, clamping");
        MAX_SCORE
    } else {
        n as u32
    }
}

/// Overall risk classification of an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskTier {
    pub fn from_score(score: u32) -> Self {
        match score {
            85.. => Self::Low,
            70..=84 => Self::Medium,
            50..=69 => Self::High,
            _ => Self::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// Compliance grade band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Platinum,
    Gold,
    Silver,
    Bronze,
    Critical,
    Catastrophic,
}

impl Grade {
    pub fn from_score(score: u32) -> Self {
        match score {
            95.. => Self::Platinum,
            85..=94 => Self::Gold,
            70..=84 => Self::Silver,
            50..=69 => Self::Bronze,
            30..=49 => Self::Critical,
            _ => Self::Catastrophic,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Platinum => "platinum",
            Self::Gold => "gold",
            Self::Silver => "silver",
            Self::Bronze => "bronze",
            Self::Critical => "critical",
            Self::Catastrophic => "catastrophic",
        }
    }
}
