//! Per-file processing: recognize, rename, tag.
//!
//! Every file walks the same states:
//!
//! ```text
//! Pending -> Recognizing -> Recognized -> Renaming -> TaggingAudio -> TaggingCover -> Done
//! ```
//!
//! Failure exits:
//! - `Recognizing`: nothing usable came back, the file is left untouched
//! - `Renaming`: the rename failed, the file keeps its name
//! - `TaggingAudio`: the file stays renamed, the outcome is a failure
//! - `TaggingCover`: logged at trace level only, the outcome is still a success
//!
//! All errors are caught here and turned into a [`PipelineOutcome`], so one
//! bad file never stops the batch.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, info_span, trace, warn};

use crate::error::AutotagError;
use crate::metadata::RecognitionResult;
use crate::naming::{compose_base_name, original_extension, resolve_destination};
use crate::retry::RecognitionClient;
use crate::sanitize::sanitize;
use crate::tags::{write_cover_art, AudioFormat, CoverFetcher, TagWriterSet, TrackTags};

/// Failure reason reported when recognition gave nothing usable.
pub const NOT_RECOGNIZED: &str = "Could not recognize file";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Pending,
    Recognizing,
    Recognized,
    Renaming,
    TaggingAudio,
    TaggingCover,
    Done,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Pending => "pending",
            PipelineState::Recognizing => "recognizing",
            PipelineState::Recognized => "recognized",
            PipelineState::Renaming => "renaming",
            PipelineState::TaggingAudio => "tagging audio",
            PipelineState::TaggingCover => "tagging cover",
            PipelineState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Result of processing one file.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    Success {
        original_path: PathBuf,
        new_path: PathBuf,
        title: String,
        artist: String,
        cover_link: Option<String>,
    },
    Failure {
        /// Where the file is now: the original path, or the new one if the
        /// rename happened before the failure.
        path: PathBuf,
        reason: String,
    },
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutcome::Success { .. })
    }

    fn failure(path: &Path, reason: impl Into<String>) -> Self {
        PipelineOutcome::Failure {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Runs files through the state machine, one at a time.
///
/// The pipeline remembers every destination it handed out during the run,
/// so two files recognized as the same track never get the same name, even
/// when nothing is renamed on disk (`modify == false`).
pub struct FilePipeline<'a> {
    recognizer: RecognitionClient<'a>,
    writers: &'a dyn TagWriterSet,
    fetcher: &'a dyn CoverFetcher,
    modify: bool,
    claimed: HashSet<PathBuf>,
}

impl<'a> FilePipeline<'a> {
    pub fn new(
        recognizer: RecognitionClient<'a>,
        writers: &'a dyn TagWriterSet,
        fetcher: &'a dyn CoverFetcher,
        modify: bool,
    ) -> Self {
        FilePipeline {
            recognizer,
            writers,
            fetcher,
            modify,
            claimed: HashSet::new(),
        }
    }

    /// Process one file. Never fails: errors become a `Failure` outcome.
    pub fn process(&mut self, path: &Path) -> PipelineOutcome {
        let span = info_span!("file", path = %path.display());
        let _enter = span.enter();
        let mut state = PipelineState::Pending;

        let Some(format) = AudioFormat::from_path(path) else {
            let err = AutotagError::UnsupportedFormat {
                path: path.to_path_buf(),
            };
            return PipelineOutcome::failure(path, err.to_string());
        };

        advance(&mut state, PipelineState::Recognizing);
        let recognized = match self.recognizer.recognize(path) {
            Ok(result) => result,
            Err(e) => {
                debug!("{}", e);
                return PipelineOutcome::failure(path, NOT_RECOGNIZED);
            }
        };
        advance(&mut state, PipelineState::Recognized);
        info!("Recognized as {}", recognized);

        let destination = match self.destination_for(path, &recognized) {
            Ok(destination) => destination,
            Err(e) => {
                warn!("{}", e);
                return PipelineOutcome::failure(path, e.to_string());
            }
        };
        self.claimed.insert(destination.clone());

        let success = PipelineOutcome::Success {
            original_path: path.to_path_buf(),
            new_path: destination.clone(),
            title: recognized.title.clone(),
            artist: recognized.artist.clone(),
            cover_link: recognized.cover_url.clone(),
        };

        if !self.modify {
            debug!("Modification disabled, would rename to {}", destination.display());
            return success;
        }

        advance(&mut state, PipelineState::Renaming);
        if destination != path {
            if let Err(source) = rename_no_clobber(path, &destination) {
                self.claimed.remove(&destination);
                let err = AutotagError::Rename {
                    from: path.to_path_buf(),
                    to: destination,
                    source,
                };
                error!("{}", err);
                return PipelineOutcome::failure(path, err.to_string());
            }
        }

        let writer = self.writers.writer_for(format);

        advance(&mut state, PipelineState::TaggingAudio);
        if let Err(e) = writer.write_tags(&destination, &track_tags(&recognized)) {
            error!("{}", e);
            return PipelineOutcome::failure(&destination, e.to_string());
        }

        advance(&mut state, PipelineState::TaggingCover);
        if let Err(e) = write_cover_art(
            writer,
            self.fetcher,
            &destination,
            recognized.cover_url.as_deref(),
        ) {
            trace!("Cover art skipped: {}", e);
        }

        advance(&mut state, PipelineState::Done);
        success
    }

    fn destination_for(&self, path: &Path, recognized: &RecognitionResult) -> Result<PathBuf, AutotagError> {
        let title = sanitize(&recognized.title);
        let artist = sanitize(&recognized.artist);
        let album = sanitize(&recognized.album);

        let base = compose_base_name(&[&title, &artist, &album]);
        resolve_destination(path, &base, original_extension(path), &self.claimed)
    }
}

/// `fs::rename` replaces an existing target on Unix. Files are processed by a
/// single pipeline, so a target that appeared after `resolve_destination` is
/// refused here instead of overwritten.
fn rename_no_clobber(from: &Path, to: &Path) -> std::io::Result<()> {
    if to.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "destination appeared after it was chosen",
        ));
    }
    fs::rename(from, to)
}

fn advance(state: &mut PipelineState, next: PipelineState) {
    trace!("{} -> {}", state, next);
    *state = next;
}

fn track_tags(recognized: &RecognitionResult) -> TrackTags {
    TrackTags {
        title: recognized.title.clone(),
        artist: recognized.artist.clone(),
        album: recognized.album.clone(),
        label: recognized.label.clone(),
        original_year: recognized.released.clone(),
    }
}
