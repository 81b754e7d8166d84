// crates/sitedocs-conformance-core/src/report.rs
// ============================================================================
// Module: Run Reports
// Description: Summary and transcript artifacts for a conformance run.
// Purpose: Write deterministic JSON and Markdown reports to a directory.
// Dependencies: serde, serde_jcs, thiserror
// ============================================================================

//! ## Overview
//! [`ReportWriter`] writes three artifacts into a report directory:
//! - `summary.json`: canonical JSON (JCS) of the [`SuiteReport`].
//! - `summary.md`: a human-readable table of case outcomes.
//! - `transcript.json`: every request the client issued. Transcripts carry
//!   the credential label only, never the key.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::client::TranscriptEntry;
use crate::suite::runner::CaseOutcome;
use crate::suite::runner::SuiteReport;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// File name of the JSON summary.
pub const SUMMARY_JSON: &str = "summary.json";
/// File name of the Markdown summary.
pub const SUMMARY_MARKDOWN: &str = "summary.md";
/// File name of the request transcript.
pub const TRANSCRIPT_JSON: &str = "transcript.json";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Report writing failures.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Directory creation or file write failed.
    #[error("failed to write {path}: {source}")]
    Io {
        /// Target path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Canonical serialization failed.
    #[error("failed to serialize {name}: {message}")]
    Serialize {
        /// Artifact name.
        name: String,
        /// Serializer message.
        message: String,
    },
}

// ============================================================================
// SECTION: Writer
// ============================================================================

/// Writes report artifacts under one directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    /// Report directory.
    root: PathBuf,
}

impl ReportWriter {
    /// Creates the report directory when missing.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Io`] when the directory cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ReportError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| ReportError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self {
            root,
        })
    }

    /// Returns the report directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes a JSON artifact using canonical JCS serialization.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] on serialization or IO failure.
    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf, ReportError> {
        let bytes = serde_jcs::to_vec(value).map_err(|err| ReportError::Serialize {
            name: name.to_string(),
            message: err.to_string(),
        })?;
        self.write_bytes(name, &bytes)
    }

    /// Writes a UTF-8 text artifact.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Io`] on failure.
    pub fn write_text(&self, name: &str, value: &str) -> Result<PathBuf, ReportError> {
        self.write_bytes(name, value.as_bytes())
    }

    /// Writes the summary and transcript artifacts for a run.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] on the first artifact that fails to write.
    pub fn write_run(
        &self,
        report: &SuiteReport,
        transcript: &[TranscriptEntry],
    ) -> Result<Vec<PathBuf>, ReportError> {
        Ok(vec![
            self.write_json(SUMMARY_JSON, report)?,
            self.write_text(SUMMARY_MARKDOWN, &summary_markdown(report))?,
            self.write_json(TRANSCRIPT_JSON, &transcript)?,
        ])
    }

    /// Writes raw bytes to a named artifact.
    fn write_bytes(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, ReportError> {
        let path = self.root.join(name);
        fs::write(&path, bytes).map_err(|source| ReportError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders a Markdown summary of a run.
#[must_use]
pub fn summary_markdown(report: &SuiteReport) -> String {
    let mut out = String::new();
    out.push_str("# SiteDocs Conformance Summary\n\n");
    out.push_str("## Totals\n\n");
    let _ = writeln!(out, "- Passed: {}", report.passed);
    let _ = writeln!(out, "- Failed: {}", report.failed);
    let _ = writeln!(out, "- Skipped: {}", report.skipped);
    let _ = writeln!(out, "- Duration (ms): {}", report.duration_ms);
    out.push_str("\n## Cases\n\n");
    if report.cases.is_empty() {
        out.push_str("- None\n");
        return out;
    }
    out.push_str("| Group | Case | Status | Attempts | Duration (ms) | Detail |\n");
    out.push_str("|---|---|---|---|---|---|\n");
    for case in &report.cases {
        let (status, detail) = match &case.outcome {
            CaseOutcome::Passed => ("passed", String::new()),
            CaseOutcome::Failed {
                error,
            } => ("failed", table_cell(error)),
            CaseOutcome::Skipped {
                reason,
            } => ("skipped", table_cell(reason)),
        };
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} |",
            case.group, case.name, status, case.attempts, case.duration_ms, detail
        );
    }
    out
}

/// Escapes text for a single Markdown table cell.
fn table_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}
