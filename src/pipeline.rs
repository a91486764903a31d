//! Acquisition pipeline
//!
//! Turns a source identifier into tagged, deduplicated files in the local
//! library by running a fixed chain of external tools:
//!
//! 1. fetch (downloader) - fatal
//! 2. import (library importer) - fatal
//! 3. deduplicate - advisory
//! 4. reindex - advisory, per-variant
//!
//! Fatal failures stop the chain and are returned to the caller. Advisory
//! failures are logged and collected as warnings; the acquisition still
//! succeeds.

pub mod runner;

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::AcquisitionConfig;
use crate::error::{GatewayError, Result};
pub use runner::{ProcessOutput, ProcessRunner, TokioProcessRunner};

/// Longest diagnostic kept per stage, in characters
const MAX_DIAGNOSTIC_CHARS: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageName {
    Fetch,
    Import,
    Deduplicate,
    Reindex,
}

impl StageName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Fetch => "fetch",
            StageName::Import => "import",
            StageName::Deduplicate => "deduplicate",
            StageName::Reindex => "reindex",
        }
    }

    /// Prefix used in user-facing failure messages
    pub fn failure_label(&self) -> &'static str {
        match self {
            StageName::Fetch => "Download",
            StageName::Import => "Import",
            StageName::Deduplicate => "Deduplication",
            StageName::Reindex => "Reindex",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Failure aborts the pipeline
    Fatal,
    /// Failure is recorded and the pipeline continues
    Advisory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// A single video
    Track,
    /// A playlist or album
    Collection,
}

#[derive(Debug, Clone)]
pub struct AcquisitionRequest {
    pub source_id: String,
    pub library_dir: PathBuf,
    pub variant: Variant,
}

impl AcquisitionRequest {
    pub fn track(video_id: impl Into<String>, library_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_id: video_id.into(),
            library_dir: library_dir.into(),
            variant: Variant::Track,
        }
    }

    pub fn collection(playlist_id: impl Into<String>, library_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_id: playlist_id.into(),
            library_dir: library_dir.into(),
            variant: Variant::Collection,
        }
    }
}

/// One external invocation in the chain
#[derive(Debug, Clone, PartialEq)]
pub struct StageSpec {
    pub name: StageName,
    pub severity: Severity,
    pub program: String,
    pub args: Vec<String>,
}

impl StageSpec {
    fn new(name: StageName, severity: Severity, program: &str, args: &[&str]) -> Self {
        Self {
            name,
            severity,
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageResult {
    pub stage: StageName,
    pub severity: Severity,
    pub success: bool,
    /// `None` if the process never exited normally
    pub exit_code: Option<i32>,
    pub diagnostic: String,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdvisoryWarning {
    pub stage: StageName,
    pub diagnostic: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AcquisitionReport {
    pub source_id: String,
    pub variant: Variant,
    pub stages: Vec<StageResult>,
    pub warnings: Vec<AdvisoryWarning>,
    pub started_at: String,
    pub finished_at: String,
}

/// Build the ordered stage list for a request.
pub fn plan(config: &AcquisitionConfig, request: &AcquisitionRequest) -> Vec<StageSpec> {
    let output_template = format!("{}/%(title)s.%(ext)s", request.library_dir.display());
    let library_dir = request.library_dir.display().to_string();

    let mut fetch_args: Vec<&str> = vec![
        "-x",
        "--audio-format",
        config.audio_format.as_str(),
        "--audio-quality",
        "0",
        "--embed-thumbnail",
        "--embed-metadata",
        "--replace-in-metadata",
        "artist",
        ",.*",
        "",
        "--no-continue",
        "-o",
        output_template.as_str(),
    ];
    if request.variant == Variant::Track {
        fetch_args.push("--no-playlist");
    }
    // Video ids may begin with '-'; nothing after "--" is read as an option.
    fetch_args.extend(["--", request.source_id.as_str()]);

    let mut stages = vec![
        StageSpec::new(StageName::Fetch, Severity::Fatal, &config.downloader, &fetch_args),
        StageSpec::new(
            StageName::Import,
            Severity::Fatal,
            &config.importer,
            &["import", library_dir.as_str(), "-q", "-A"],
        ),
        StageSpec::new(
            StageName::Deduplicate,
            Severity::Advisory,
            &config.importer,
            &["duplicates", "--delete"],
        ),
    ];

    let reindex = match request.variant {
        Variant::Track => config.reindex_tracks,
        Variant::Collection => config.reindex_collections,
    };
    if reindex {
        stages.push(StageSpec::new(
            StageName::Reindex,
            Severity::Advisory,
            &config.importer,
            &["update"],
        ));
    }

    stages
}

pub struct AcquisitionPipeline {
    config: AcquisitionConfig,
    runner: Arc<dyn ProcessRunner>,
    // Held for a whole run: the library directory has no other guard.
    library_lock: Mutex<()>,
}

impl AcquisitionPipeline {
    pub fn new(config: AcquisitionConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            config,
            runner,
            library_lock: Mutex::new(()),
        }
    }

    pub async fn acquire_track(self: Arc<Self>, video_id: &str) -> Result<AcquisitionReport> {
        let video_id = required_id(video_id, "video_id is required")?;
        let request = AcquisitionRequest::track(video_id, &self.config.library_dir);
        self.acquire(request).await
    }

    pub async fn acquire_collection(self: Arc<Self>, playlist_id: &str) -> Result<AcquisitionReport> {
        let playlist_id = required_id(playlist_id, "playlist_id is required")?;
        let request = AcquisitionRequest::collection(playlist_id, &self.config.library_dir);
        self.acquire(request).await
    }

    /// Run the stage chain on its own task. Dropping the returned future
    /// (a client hanging up) does not interrupt the run; it still finishes,
    /// logs its outcome and releases the library lock.
    pub async fn acquire(self: Arc<Self>, request: AcquisitionRequest) -> Result<AcquisitionReport> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "acquisition",
            %run_id,
            source = %request.source_id,
            variant = ?request.variant
        );

        let task = tokio::spawn(async move { self.run_locked(request).await }.instrument(span));
        task.await.map_err(|e| {
            tracing::error!("Acquisition task {} did not complete: {}", run_id, e);
            GatewayError::Internal(format!("Acquisition task did not complete: {}", e))
        })?
    }

    async fn run_locked(&self, request: AcquisitionRequest) -> Result<AcquisitionReport> {
        if self.library_lock.try_lock().is_err() {
            tracing::info!("Waiting for another acquisition to finish");
        }
        let _guard = self.library_lock.lock().await;

        let started_at = chrono::Utc::now().to_rfc3339();
        let stages = plan(&self.config, &request);
        let mut results = Vec::with_capacity(stages.len());
        let mut warnings = Vec::new();

        for spec in &stages {
            let result = self.run_stage(spec).await;

            if !result.success {
                match spec.severity {
                    Severity::Fatal => {
                        tracing::error!(
                            "Stage {} failed, aborting: {}",
                            spec.name.as_str(),
                            result.diagnostic
                        );
                        return Err(GatewayError::AcquisitionFailed {
                            stage: spec.name,
                            diagnostic: result.diagnostic,
                        });
                    }
                    Severity::Advisory => {
                        tracing::warn!(
                            "Stage {} failed, continuing: {}",
                            spec.name.as_str(),
                            result.diagnostic
                        );
                        warnings.push(AdvisoryWarning {
                            stage: spec.name,
                            diagnostic: result.diagnostic.clone(),
                        });
                    }
                }
            }

            results.push(result);
        }

        tracing::info!(
            "Acquisition of {} finished with {} warning(s)",
            request.source_id,
            warnings.len()
        );

        Ok(AcquisitionReport {
            source_id: request.source_id,
            variant: request.variant,
            stages: results,
            warnings,
            started_at,
            finished_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    async fn run_stage(&self, spec: &StageSpec) -> StageResult {
        tracing::info!("Running stage {}: {}", spec.name.as_str(), spec.command_line());
        let started = Instant::now();

        let outcome = self
            .runner
            .run(&spec.program, &spec.args, self.config.stage_timeout)
            .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let (success, exit_code, diagnostic) = match outcome {
            Ok(output) => {
                let captured = tail(captured_text(&output), MAX_DIAGNOSTIC_CHARS);
                if output.success() {
                    (true, output.exit_code, captured)
                } else {
                    let status = match output.exit_code {
                        Some(code) => format!("exit status {}", code),
                        None => "terminated by signal".to_string(),
                    };
                    let diagnostic = if captured.is_empty() {
                        status
                    } else {
                        format!("{}: {}", status, captured)
                    };
                    (false, output.exit_code, diagnostic)
                }
            }
            Err(e) => (false, None, format!("{:#}", e)),
        };

        tracing::debug!(
            "Stage {} finished in {} ms (success: {})",
            spec.name.as_str(),
            elapsed_ms,
            success
        );

        StageResult {
            stage: spec.name,
            severity: spec.severity,
            success,
            exit_code,
            diagnostic,
            elapsed_ms,
        }
    }
}

fn required_id<'a>(value: &'a str, message: &str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(GatewayError::invalid(message));
    }
    Ok(value)
}

/// stderr carries the tools' diagnostics; fall back to stdout when it is empty.
fn captured_text(output: &ProcessOutput) -> &str {
    let stderr = output.stderr.trim();
    if stderr.is_empty() {
        output.stdout.trim()
    } else {
        stderr
    }
}

/// Keep the last `max` characters, where tools print their final error.
fn tail(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        return text.to_string();
    }
    let kept: String = text.chars().skip(count - max).collect();
    format!("...{}", kept)
}
