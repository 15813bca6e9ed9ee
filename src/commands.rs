use anyhow::{Context, Result};
use console::style;
use indexmap::IndexMap;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use crate::config::{CONFIG_FILE_NAME, Config};
use crate::loader::{DocumentFormat, load_document_file, load_questions_file};
use crate::ollama::OllamaClient;
use crate::session::QaSession;

#[derive(Debug, Serialize)]
struct AskOutput<'a> {
    results: &'a IndexMap<String, String>,
}

/// Render answers as the `{"results": {question: answer}}` JSON document
#[inline]
pub fn render_results(answers: &IndexMap<String, String>) -> Result<String> {
    serde_json::to_string_pretty(&AskOutput { results: answers })
        .context("Failed to serialize answers")
}

/// Answer every question in `questions_path` against `document_path`
#[inline]
pub async fn ask(
    config: &Config,
    document_path: &Path,
    questions_path: &Path,
    output: Option<&Path>,
) -> Result<()> {
    let started = Instant::now();

    let questions = load_questions_file(questions_path, &config.limits)
        .with_context(|| format!("Failed to load questions from {}", questions_path.display()))?;
    let format = DocumentFormat::from_path(document_path)?;
    let document = load_document_file(document_path, &config.limits)
        .with_context(|| format!("Failed to load document {}", document_path.display()))?;

    let mut session = QaSession::from_config(config)?;
    session
        .load_document(&document)
        .await
        .context("Document is empty or could not be processed")?;

    let answers = session.answer_questions(&questions).await?;
    let rendered = render_results(&answers)?;

    match output {
        Some(path) => {
            fs::write(path, &rendered)
                .with_context(|| format!("Failed to write answers to {}", path.display()))?;
            eprintln!("Answers written to {}", style(path.display()).cyan());
        }
        None => println!("{rendered}"),
    }

    let elapsed = started.elapsed().as_secs_f64();
    info!(
        num_questions = questions.len(),
        document_type = ?format,
        document_size_bytes = document.len(),
        response_time_seconds = elapsed,
        questions_per_second = if elapsed > 0.0 {
            questions.len() as f64 / elapsed
        } else {
            0.0
        },
        "QA processing completed successfully"
    );

    if let Some(metrics) = session.last_metrics() {
        eprintln!(
            "{} {}/{} answered, {} tokens, {:.2}s",
            style("Done:").bold().green(),
            metrics.successful_answers,
            answers.len(),
            metrics.total_tokens(),
            metrics.total_time.as_secs_f64()
        );
    }

    Ok(())
}

/// Check that Ollama is reachable and both models are installed
#[inline]
pub fn check_health(config: &Config) -> Result<()> {
    let client = OllamaClient::new(&config.ollama)?;

    match client.health_check() {
        Ok(()) => {
            eprintln!(
                "{} Ollama at {} is healthy",
                style("✓").green(),
                client.base_url()
            );
            eprintln!("  Embedding model: {}", config.ollama.embedding_model);
            eprintln!("  Generation model: {}", config.ollama.generation_model);
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {:#}", style("✗").red(), e);
            Err(e.context("Ollama health check failed"))
        }
    }
}

/// Write the default configuration into `config_dir` unless a file exists
#[inline]
pub fn init_config(config_dir: &Path) -> Result<PathBuf> {
    let path = config_dir.join(CONFIG_FILE_NAME);
    if path.exists() {
        eprintln!(
            "Config file already exists at {}",
            style(path.display()).dim()
        );
        return Ok(path);
    }

    let config = Config {
        base_dir: config_dir.to_path_buf(),
        ..Config::default()
    };
    config.save()?;

    eprintln!("Wrote default configuration to {}", style(path.display()).cyan());
    Ok(path)
}
