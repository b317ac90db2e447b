//! Batch driver: scan a directory tree and run every audio file through the
//! [`FilePipeline`], strictly one file after the other.
//!
//! Each file must see the directory as left by the previous one: collision
//! resolution reads the listing that earlier renames changed.

use std::fs;
use std::path::{Component, Path, PathBuf};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::{debug, error, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::Settings;
use crate::error::{AutotagError, Result};
use crate::pipeline::{FilePipeline, PipelineOutcome};
use crate::recognizer::RecognitionService;
use crate::retry::{RecognitionClient, Sleeper};
use crate::tags::{AudioFormat, CoverFetcher, TagWriterSet};

/// Label shown next to the progress bar.
pub const PROGRESS_LABEL: &str = "Recognizing and tagging";

/// Path segment reserved for the self-test fixtures.
const RESERVED_SEGMENT: &str = "test";

/// Outcomes of one batch run, in processing order.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub outcomes: Vec<PipelineOutcome>,
    /// Whether files were actually modified
    pub modify: bool,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// One line per file plus the final count.
    pub fn report_lines(&self) -> Vec<String> {
        let action = if self.modify {
            "Renamed"
        } else {
            "Will be renamed in"
        };

        let mut lines: Vec<String> = self
            .outcomes
            .iter()
            .map(|outcome| match outcome {
                PipelineOutcome::Success {
                    original_path,
                    new_path,
                    ..
                } => format!(
                    "{}: {} -> {}",
                    action,
                    display_name(original_path),
                    display_name(new_path)
                ),
                PipelineOutcome::Failure { path, reason } => {
                    format!("File: {} - Error: {}", display_name(path), reason)
                }
            })
            .collect();

        lines.push(format!("Succeed {}/{}", self.succeeded(), self.total()));
        lines
    }

    pub fn print(&self) {
        for line in self.report_lines() {
            println!("{}", line);
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// True if any component of `path` is exactly `test`.
///
/// Relative paths and symlinks are resolved first, so `.` run from inside a
/// `test` directory is caught too.
pub fn is_reserved_test_path(path: &Path) -> bool {
    let resolved = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    [path, resolved.as_path()].iter().any(|p| {
        p.components()
            .any(|c| matches!(c, Component::Normal(name) if name == RESERVED_SEGMENT))
    })
}

/// Subdirectories whose name contains "test" (any case) are never entered.
fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_string_lossy()
            .to_lowercase()
            .contains(RESERVED_SEGMENT)
}

/// Recursively collect supported audio files below `root`, in a stable
/// (file-name sorted) order.
pub fn scan(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(AutotagError::DirectoryNotFound(root.to_path_buf()));
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e));

    for entry in walker {
        let entry = entry.map_err(|e| AutotagError::Walk {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;
        if entry.file_type().is_file() && AudioFormat::from_path(entry.path()).is_some() {
            debug!("Discovered: {}", entry.path().display());
            files.push(entry.into_path());
        }
    }

    info!("Discovered {} audio files", files.len());
    Ok(files)
}

fn progress_bar(len: u64, visible: bool) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if visible {
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
    } else {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }
    pb.set_message(PROGRESS_LABEL);
    pb
}

/// Everything a batch run talks to.
pub struct BatchDriver<'a> {
    pub service: &'a dyn RecognitionService,
    pub sleeper: &'a dyn Sleeper,
    pub writers: &'a dyn TagWriterSet,
    pub fetcher: &'a dyn CoverFetcher,
}

impl<'a> BatchDriver<'a> {
    /// Process every supported file below `settings.input` and print the
    /// per-file report.
    ///
    /// Directories with a `test` path segment are rejected unless
    /// `settings.test_mode` is set. Per-file failures are part of the
    /// summary; only scan errors abort the run.
    pub fn process_directory(&self, settings: &Settings) -> Result<BatchSummary> {
        let root = settings.input.as_path();

        if !settings.test_mode && is_reserved_test_path(root) {
            let err = AutotagError::RejectedDirectory(root.to_path_buf());
            error!("{}", err);
            return Err(err);
        }

        let files = scan(root)?;
        if files.is_empty() {
            warn!("No supported audio files found in {}", root.display());
            println!("No MP3 or Opus files found in {}", root.display());
            return Ok(BatchSummary {
                outcomes: Vec::new(),
                modify: settings.modify,
            });
        }

        let client = RecognitionClient::new(
            self.service,
            self.sleeper,
            settings.max_retries,
            settings.delay,
        );
        let mut pipeline = FilePipeline::new(client, self.writers, self.fetcher, settings.modify);

        let pb = progress_bar(files.len() as u64, settings.show_progress);
        let mut outcomes = Vec::with_capacity(files.len());
        for file in &files {
            outcomes.push(pipeline.process(file));
            pb.inc(1);
        }
        pb.finish_and_clear();

        let summary = BatchSummary {
            outcomes,
            modify: settings.modify,
        };
        summary.print();
        Ok(summary)
    }
}
