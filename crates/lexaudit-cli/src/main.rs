mod config;
mod display;
mod report;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lexaudit_ai::{AnalysisRequest, Analyzer, DocumentType, TextGenerator};

use crate::config::Settings;
use crate::report::AnalysisReport;

#[derive(Parser, Debug)]
#[command(name = "lexaudit", about = "NDPA compliance assessment of privacy documents", version)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a policy document with Gemini
    Analyze {
        /// Plain-text document to assess
        #[arg(short, long)]
        file: PathBuf,
        #[arg(short, long)]
        company: String,
        #[arg(long)]
        industry: Option<String>,
        #[arg(long, default_value_t = DocumentType::PrivacyPolicy)]
        document_type: DocumentType,
        #[arg(long)]
        company_size: Option<String>,
        #[arg(long)]
        target_users: Option<String>,
        #[arg(long)]
        processing_scope: Option<String>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Recover an assessment from a captured model response
    Assess {
        /// File holding the raw response text
        #[arg(short, long)]
        response: PathBuf,
        #[arg(short, long, default_value = "Unknown")]
        company: String,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the citation table entry for a key such as "S. 37"
    Citation { key: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    info!("lexaudit v{}", env!("CARGO_PKG_VERSION"));
    let settings = cli.settings;

    match cli.command {
        Command::Analyze {
            file,
            company,
            industry,
            document_type,
            company_size,
            target_users,
            processing_scope,
            json,
        } => {
            let document_text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let request = AnalysisRequest {
                company_name: company,
                document_text,
                document_type,
                industry,
                company_size,
                target_users,
                processing_scope,
            };
            let analyzer = build_analyzer(&settings, settings.require_generator()?)?;
            let report = report::run_analysis(&analyzer, &request).await?;
            emit(&report, json)?;
        }
        Command::Assess {
            response,
            company,
            json,
        } => {
            let raw = std::fs::read_to_string(&response)
                .with_context(|| format!("reading {}", response.display()))?;
            let analyzer = build_analyzer(&settings, settings.generator_or_offline())?;
            let report = report::run_assessment(&analyzer, company, &raw).await;
            emit(&report, json)?;
        }
        Command::Citation { key } => {
            let table = settings.load_citations()?;
            display::print_citation(&table, &key);
        }
    }

    Ok(())
}

fn build_analyzer(settings: &Settings, generator: Arc<dyn TextGenerator>) -> Result<Analyzer> {
    let citations = settings.load_citations()?;
    let templates = settings.load_templates()?;
    Ok(Analyzer::new(
        generator,
        Arc::new(citations),
        Arc::new(templates),
        settings.analyzer_options(),
    ))
}

fn emit(report: &AnalysisReport, json: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(report).context("serializing report")?;
        println!("{out}");
    } else {
        display::print_assessment_card(report);
    }
    Ok(())
}
