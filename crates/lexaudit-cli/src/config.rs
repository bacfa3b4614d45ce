//! Runtime settings: command-line flags with environment fallbacks.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use async_trait::async_trait;
use clap::Args;
use tracing::info;

use lexaudit_ai::{
    AnalyzerOptions, GenerationParams, PromptTemplates, TextGenerator, UpstreamError,
};
use lexaudit_core::CitationTable;
use lexaudit_gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL, GeminiClient};

#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Gemini model name
    #[arg(long, env = "LEXAUDIT_MODEL", default_value = DEFAULT_MODEL, global = true)]
    pub model: String,

    /// Gemini API root
    #[arg(long, env = "LEXAUDIT_GEMINI_URL", default_value = DEFAULT_BASE_URL, global = true)]
    pub gemini_url: String,

    /// Sampling temperature of the analysis call (0.0 to 2.0)
    #[arg(long, env = "LEXAUDIT_TEMPERATURE", value_parser = parse_temperature, global = true)]
    pub temperature: Option<f32>,

    /// Output token limit of the analysis call
    #[arg(
        long,
        env = "LEXAUDIT_MAX_TOKENS",
        default_value_t = 8192,
        value_parser = clap::value_parser!(u32).range(100..=32000),
        global = true
    )]
    pub max_tokens: u32,

    /// Per-attempt deadline of the analysis call, in seconds
    #[arg(
        long,
        env = "LEXAUDIT_ANALYSIS_TIMEOUT_SECS",
        default_value_t = 120,
        value_parser = clap::value_parser!(u64).range(1..),
        global = true
    )]
    pub analysis_timeout_secs: u64,

    /// Deadline of each fix enrichment call, in seconds
    #[arg(
        long,
        env = "LEXAUDIT_FIX_TIMEOUT_SECS",
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..),
        global = true
    )]
    pub fix_timeout_secs: u64,

    /// Fix enrichment calls in flight at once
    #[arg(
        long,
        env = "LEXAUDIT_FIX_CONCURRENCY",
        default_value_t = 4,
        value_parser = clap::value_parser!(u64).range(1..=8),
        global = true
    )]
    pub fix_concurrency: u64,

    /// Upper bound on fixes per assessment
    #[arg(long, env = "LEXAUDIT_MAX_FIXES", default_value_t = 10, global = true)]
    pub max_fixes: usize,

    /// JSON file of citation overrides: {"S. 5": {"title": "...", "summary": "..."}}
    #[arg(long, global = true)]
    pub citations: Option<PathBuf>,

    /// File replacing the built-in analysis prompt template
    #[arg(long, global = true)]
    pub prompt_template: Option<PathBuf>,
}

fn parse_temperature(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .trim()
        .parse()
        .map_err(|_| format!("{s:?} is not a number"))?;
    if !(0.0..=2.0).contains(&value) {
        return Err(format!("{value} is outside 0.0..=2.0"));
    }
    Ok(value)
}

impl Settings {
    pub fn analyzer_options(&self) -> AnalyzerOptions {
        let defaults = AnalyzerOptions::default();
        let mut options = AnalyzerOptions {
            params: GenerationParams::new(
                self.temperature.unwrap_or(defaults.params.temperature),
                self.max_tokens,
            ),
            timeout: Duration::from_secs(self.analysis_timeout_secs),
            ..defaults
        };
        options.fixes.max_fixes = self.max_fixes;
        options.fixes.concurrency = self.fix_concurrency as usize;
        options.fixes.timeout = Duration::from_secs(self.fix_timeout_secs);
        options
    }

    /// Built-in citation table with the `--citations` overrides applied.
    pub fn load_citations(&self) -> anyhow::Result<CitationTable> {
        let mut table = CitationTable::builtin();
        if let Some(path) = &self.citations {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading citation overrides {}", path.display()))?;
            table
                .merge_json(&json)
                .with_context(|| format!("parsing citation overrides {}", path.display()))?;
        }
        Ok(table)
    }

    pub fn load_templates(&self) -> anyhow::Result<PromptTemplates> {
        let Some(path) = &self.prompt_template else {
            return Ok(PromptTemplates::default());
        };
        let template = std::fs::read_to_string(path)
            .with_context(|| format!("reading prompt template {}", path.display()))?;
        if !template.contains("{document_text}") {
            bail!(
                "prompt template {} has no {{document_text}} placeholder",
                path.display()
            );
        }
        Ok(PromptTemplates::with_analysis(template))
    }

    fn gemini(&self) -> Option<GeminiClient> {
        let key = self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())?;
        Some(GeminiClient::new(
            self.gemini_url.clone(),
            self.model.clone(),
            key.to_string(),
        ))
    }

    /// Gemini generator; fails when no API key is configured.
    pub fn require_generator(&self) -> anyhow::Result<Arc<dyn TextGenerator>> {
        match self.gemini() {
            Some(client) => {
                info!(model = %client.model(), "using gemini");
                Ok(Arc::new(client))
            }
            None => bail!("GEMINI_API_KEY is not set (pass --api-key or export it)"),
        }
    }

    /// Gemini when a key is configured, otherwise a generator that always
    /// fails so every fix falls back to its deterministic form.
    pub fn generator_or_offline(&self) -> Arc<dyn TextGenerator> {
        match self.gemini() {
            Some(client) => Arc::new(client),
            None => {
                info!("no API key configured; fixes will use deterministic fallbacks");
                Arc::new(Offline)
            }
        }
    }
}

struct Offline;

#[async_trait]
impl TextGenerator for Offline {
    async fn generate(
        &self,
        _prompt: &str,
        _params: GenerationParams,
    ) -> Result<String, UpstreamError> {
        Err(UpstreamError::Transport("offline: no API key configured".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        settings: Settings,
    }

    fn parse(args: &[&str]) -> Result<Settings, clap::Error> {
        let argv = std::iter::once("lexaudit").chain(args.iter().copied());
        Harness::try_parse_from(argv).map(|h| h.settings)
    }

    #[test]
    fn temperature_bounds() {
        assert_eq!(parse_temperature("0"), Ok(0.0));
        assert_eq!(parse_temperature(" 2.0 "), Ok(2.0));
        assert!(parse_temperature("2.5").is_err());
        assert!(parse_temperature("-0.1").is_err());
        assert!(parse_temperature("warm").is_err());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(parse(&["--max-tokens", "50"]).is_err());
        assert!(parse(&["--max-tokens", "32001"]).is_err());
        assert!(parse(&["--fix-concurrency", "0"]).is_err());
        assert!(parse(&["--fix-concurrency", "9"]).is_err());
        assert!(parse(&["--temperature", "3"]).is_err());
    }

    #[test]
    fn flags_flow_into_analyzer_options() {
        let settings = parse(&[
            "--temperature",
            "0.3",
            "--max-tokens",
            "4096",
            "--analysis-timeout-secs",
            "30",
            "--fix-timeout-secs",
            "15",
            "--fix-concurrency",
            "2",
            "--max-fixes",
            "3",
        ])
        .unwrap();
        let options = settings.analyzer_options();
        assert_eq!(options.params, GenerationParams::new(0.3, 4096));
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert_eq!(options.fixes.timeout, Duration::from_secs(15));
        assert_eq!(options.fixes.concurrency, 2);
        assert_eq!(options.fixes.max_fixes, 3);
        // Fix calls keep their own sampling parameters.
        assert_eq!(options.fixes.params, AnalyzerOptions::default().fixes.params);
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let settings = parse(&["--api-key", "  "]).unwrap();
        assert!(settings.require_generator().is_err());
    }

    #[tokio::test]
    async fn offline_generator_always_fails() {
        let err = Offline
            .generate("prompt", GenerationParams::new(0.4, 2048))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Transport(_)));
    }

    #[test]
    fn template_without_document_placeholder_is_rejected() {
        let dir = std::env::temp_dir().join(format!("lexaudit-template-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("template.txt");
        std::fs::write(&path, "Assess {company_name}").unwrap();

        let settings = parse(&["--prompt-template", path.to_str().unwrap()]).unwrap();
        assert!(settings.load_templates().is_err());

        std::fs::write(&path, "Assess {company_name}: {document_text}").unwrap();
        let templates = settings.load_templates().unwrap();
        assert_eq!(templates.analysis, "Assess {company_name}: {document_text}");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn citation_overrides_are_merged() {
        let dir = std::env::temp_dir().join(format!("lexaudit-citations-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("citations.json");
        std::fs::write(&path, r#"{"S. 99": {"title": "Custom Provision"}}"#).unwrap();

        let settings = parse(&["--citations", path.to_str().unwrap()]).unwrap();
        let table = settings.load_citations().unwrap();
        assert_eq!(table.title("S. 99"), "Custom Provision");
        assert_eq!(table.title("S. 5"), CitationTable::builtin().title("S. 5"));

        std::fs::write(&path, "not json").unwrap();
        assert!(settings.load_citations().is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
