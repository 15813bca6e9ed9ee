//! Document and question file loading
//!
//! Turns the files handed to the CLI into plain document text and a validated
//! question list. All failures surface as [`DocQaError::Validation`] or
//! [`DocQaError::Io`].


use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::config::LimitsConfig;
use crate::{DocQaError, Result};

/// Supported document file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Text,
    Markdown,
    Pdf,
}

impl DocumentFormat {
    /// Detect the format from the file extension (case-insensitive)
    #[inline]
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "json" => Ok(Self::Json),
            "txt" => Ok(Self::Text),
            "md" | "markdown" => Ok(Self::Markdown),
            "pdf" => Ok(Self::Pdf),
            other => Err(DocQaError::Validation(format!(
                "Unsupported document type {:?}; expected .pdf, .json, .txt or .md",
                other
            ))),
        }
    }
}

fn check_file_size(path: &Path, limits: &LimitsConfig) -> Result<()> {
    let size = fs::metadata(path)?.len();
    let max = limits.max_file_size_bytes();
    if size > max {
        return Err(DocQaError::Validation(format!(
            "File {} ({:.2}MB) exceeds maximum allowed size ({}MB)",
            path.display(),
            size as f64 / (1024.0 * 1024.0),
            limits.max_file_size_mb
        )));
    }

    Ok(())
}

fn read_limited(path: &Path, limits: &LimitsConfig) -> Result<String> {
    check_file_size(path, limits)?;
    Ok(fs::read_to_string(path)?)
}

fn read_limited_bytes(path: &Path, limits: &LimitsConfig) -> Result<Vec<u8>> {
    check_file_size(path, limits)?;
    Ok(fs::read(path)?)
}

/// Extract the text of every page, pages separated by a blank line
#[inline]
pub fn pdf_text(bytes: &[u8]) -> Result<String> {
    let invalid = |e: lopdf::Error| DocQaError::Validation(format!("Failed to read PDF: {e}"));

    let document = lopdf::Document::load_mem(bytes).map_err(invalid)?;
    let pages = document
        .get_pages()
        .into_keys()
        .map(|page| document.extract_text(&[page]).map_err(invalid))
        .collect::<Result<Vec<_>>>()?;

    debug!("Extracted text from {} PDF pages", pages.len());
    Ok(pages.join("\n\n"))
}

/// Load a document file and return its text
#[inline]
pub fn load_document_file(path: &Path, limits: &LimitsConfig) -> Result<String> {
    let format = DocumentFormat::from_path(path)?;

    let text = match format {
        DocumentFormat::Json => {
            let value: Value = serde_json::from_str(&read_limited(path, limits)?)?;
            document_text_from_json(&value)
        }
        DocumentFormat::Text | DocumentFormat::Markdown => read_limited(path, limits)?,
        DocumentFormat::Pdf => pdf_text(&read_limited_bytes(path, limits)?)?,
    };

    debug!(
        "Loaded {:?} document from {} ({} chars)",
        format,
        path.display(),
        text.chars().count()
    );
    Ok(text)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        other => other.to_string(),
    }
}

/// Render a parsed JSON document as text.
///
/// Objects become one `key: value` line per entry with nested values
/// pretty-printed. An object whose `content` entry is blank renders as an
/// empty string. Arrays render item by item; scalars as their text.
#[inline]
pub fn document_text_from_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            if map.get("content").is_some_and(is_blank) {
                return String::new();
            }
            map.iter()
                .map(|(key, value)| format!("{}: {}", key, render_value(value)))
                .collect::<Vec<_>>()
                .join("\n")
        }
        Value::Array(items) => items
            .iter()
            .map(|item| serde_json::to_string_pretty(item).unwrap_or_else(|_| item.to_string()))
            .collect::<Vec<_>>()
            .join("\n"),
        other => render_value(other),
    }
}

fn strings_or_question_objects(items: &[Value]) -> Option<Vec<String>> {
    if let Some(strings) = items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
    {
        return Some(strings);
    }

    items
        .iter()
        .map(|item| {
            item.get("question")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .collect()
}

/// Extract questions from parsed JSON.
///
/// Accepts a list of strings, a list of `{"question": ...}` objects, or an
/// object with a `questions` key holding either list shape.
#[inline]
pub fn questions_from_json(value: &Value) -> Result<Vec<String>> {
    let unsupported = || DocQaError::Validation("Unsupported JSON structure for questions".to_string());

    match value {
        Value::Array(items) => strings_or_question_objects(items).ok_or_else(unsupported),
        Value::Object(map) => match map.get("questions") {
            Some(Value::Array(items)) => strings_or_question_objects(items).ok_or_else(unsupported),
            _ => Err(unsupported()),
        },
        _ => Err(DocQaError::Validation(
            "Questions file must contain a list or an object with questions".to_string(),
        )),
    }
}

/// Check a question list against the configured limits
#[inline]
pub fn validate_questions(questions: &[String], limits: &LimitsConfig) -> Result<()> {
    if questions.is_empty() {
        return Err(DocQaError::Validation(
            "No questions found in the questions file".to_string(),
        ));
    }

    if questions.len() > limits.max_questions {
        return Err(DocQaError::Validation(format!(
            "Number of questions ({}) exceeds maximum allowed ({})",
            questions.len(),
            limits.max_questions
        )));
    }

    if let Some(position) = questions
        .iter()
        .position(|q| q.chars().count() > limits.max_question_length)
    {
        return Err(DocQaError::Validation(format!(
            "Question {} exceeds maximum length of {} characters",
            position + 1,
            limits.max_question_length
        )));
    }

    Ok(())
}

/// Load and validate a JSON questions file
#[inline]
pub fn load_questions_file(path: &Path, limits: &LimitsConfig) -> Result<Vec<String>> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if !is_json {
        return Err(DocQaError::Validation(
            "Questions file must be a JSON file".to_string(),
        ));
    }

    let raw = read_limited(path, limits)?;
    let value: Value = serde_json::from_str(&raw)?;
    let questions = questions_from_json(&value)?;
    validate_questions(&questions, limits)?;

    debug!("Loaded {} questions from {}", questions.len(), path.display());
    Ok(questions)
}
