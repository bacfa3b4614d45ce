pub mod assessment;
pub mod citations;
pub mod score;

pub use assessment::{
    AssessmentResult, EffortLevel, ExecutiveSummary, Fix, FixSource, Gap, LegalReference,
    Severity, SeverityCounts,
};
pub use citations::{CitationError, CitationTable, NDPA_2023, canonical_regulation};
pub use score::{Grade, RiskTier, resolve_score};
