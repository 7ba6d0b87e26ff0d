//! Extraction pipeline: decode, name, and write every frame of a container.
//!
//! A run moves through `Opening → Decoding(n) → Completed`, or ends in
//! `Failed` from either of the first two states. A failure after some frames
//! were written leaves those files in place; each frame is a usable image on
//! its own. Nothing is retried.
//!
//! # Example
//!
//! ```no_run
//! use unanimate::{ExtractionConfig, ExtractionPipeline};
//!
//! let pipeline = ExtractionPipeline::new(ExtractionConfig::new().with_path_prefix("outputs"));
//! let result = pipeline.run("upload.gif", "static/outputs/20240101_120000", Some("logo"))?;
//! for frame in result.frames() {
//!     println!("{} -> {}", frame.ordinal(), frame.relative_path());
//! }
//! # Ok::<(), unanimate::UnanimateError>(())
//! ```

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use serde_json::{Value, json};

use crate::{
    config::ExtractionConfig,
    decoder::{FrameDecoder, FrameSource, FrameStep},
    error::UnanimateError,
    naming::FrameNamer,
    progress::{OperationType, ProgressTracker},
    storage::{FrameStore, LocalStore},
    writer::{FrameDescriptor, FrameWriter},
};

/// Outcome of a completed extraction run.
///
/// Built once at the end of a run and never modified. `total_frames` always
/// equals `frames().len()`, and frames are in ascending ordinal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    success: bool,
    total_frames: u64,
    frames: Vec<FrameDescriptor>,
    output_location: PathBuf,
}

impl ExtractionResult {
    fn completed(frames: Vec<FrameDescriptor>, output_location: PathBuf) -> Self {
        Self {
            success: true,
            total_frames: frames.len() as u64,
            frames,
            output_location,
        }
    }

    /// Always `true`: failed runs return an error instead of a result.
    pub fn success(&self) -> bool {
        self.success
    }

    /// Number of frames written.
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Descriptors of the written frames, by ascending ordinal.
    pub fn frames(&self) -> &[FrameDescriptor] {
        &self.frames
    }

    /// Directory the frames were written into.
    pub fn output_location(&self) -> &Path {
        &self.output_location
    }

    /// Consume the result, keeping only the descriptors.
    pub fn into_frames(self) -> Vec<FrameDescriptor> {
        self.frames
    }

    /// JSON envelope in the shape the upload endpoint returns.
    pub fn to_json(&self) -> Value {
        json!({
            "success": self.success,
            "total_frames": self.total_frames,
            "frames": self
                .frames
                .iter()
                .map(|frame| json!({
                    "name": frame.filename(),
                    "path": frame.relative_path(),
                    "index": frame.ordinal(),
                }))
                .collect::<Vec<_>>(),
            "output_dir": self.output_location.to_string_lossy(),
        })
    }
}

/// States of one extraction run.
#[derive(Debug)]
enum ExtractionState {
    Decoding { ordinal: u64 },
    Completed,
    Failed(UnanimateError),
}

/// Runs extractions with a fixed configuration and output store.
///
/// The pipeline holds no per-run state, so one instance can serve many
/// runs, including concurrent runs into distinct output directories.
pub struct ExtractionPipeline {
    config: ExtractionConfig,
    store: Arc<dyn FrameStore>,
}

impl ExtractionPipeline {
    /// Pipeline writing to the local filesystem.
    pub fn new(config: ExtractionConfig) -> Self {
        Self::with_store(config, Arc::new(LocalStore))
    }

    /// Pipeline writing through a custom [`FrameStore`].
    pub fn with_store(config: ExtractionConfig, store: Arc<dyn FrameStore>) -> Self {
        Self { config, store }
    }

    /// The pipeline's configuration.
    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract every frame of the container at `input` into `output_dir`.
    ///
    /// # Errors
    ///
    /// - [`UnanimateError::NotFound`] if `input` does not exist.
    /// - [`UnanimateError::DecodeError`] if its header is unreadable; no
    ///   output is created in that case.
    /// - [`UnanimateError::FrameDecodeError`], [`UnanimateError::EncodeError`],
    ///   or [`UnanimateError::IoError`] for a fault partway through; frames
    ///   written before the fault are kept.
    /// - [`UnanimateError::Cancelled`] if the configured token is cancelled.
    pub fn run<P, Q>(
        &self,
        input: P,
        output_dir: Q,
        prefix: Option<&str>,
    ) -> Result<ExtractionResult, UnanimateError>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let input = input.as_ref();
        log::info!("Processing: {}", input.display());

        // Opening. The decoder is dropped, closing the container, on every
        // path out of this function.
        let mut decoder = FrameDecoder::open(input).inspect_err(|error| {
            log::warn!("Failed to open {}: {error}", input.display());
        })?;
        self.run_source(&mut decoder, output_dir, prefix)
    }

    /// Extract every frame produced by `source` into `output_dir`.
    ///
    /// Errors are as for [`run`](ExtractionPipeline::run), minus the ones
    /// raised while opening a container.
    pub fn run_source<S, Q>(
        &self,
        source: &mut S,
        output_dir: Q,
        prefix: Option<&str>,
    ) -> Result<ExtractionResult, UnanimateError>
    where
        S: FrameSource + ?Sized,
        Q: AsRef<Path>,
    {
        let output_dir = output_dir.as_ref();
        let namer = FrameNamer::new(prefix, self.config.output_format);
        let mut writer = FrameWriter::new(
            self.store.clone(),
            self.config.output_format,
            self.config.path_prefix.clone(),
        );
        let mut tracker = ProgressTracker::new(
            self.config.progress.clone(),
            OperationType::FrameExtraction,
            None,
            self.config.batch_size,
        );
        let mut frames = Vec::new();

        let mut state = ExtractionState::Decoding { ordinal: 0 };
        loop {
            state = match state {
                ExtractionState::Decoding { ordinal } => self.decode_step(
                    source,
                    ordinal,
                    output_dir,
                    &namer,
                    &mut writer,
                    &mut frames,
                    &mut tracker,
                ),
                ExtractionState::Completed => {
                    // A zero-frame container still yields an existing
                    // output directory.
                    writer.ensure_directory(output_dir)?;
                    tracker.finish();
                    let result = ExtractionResult::completed(frames, output_dir.to_path_buf());
                    log::info!(
                        "{} frames extracted to {}",
                        result.total_frames(),
                        output_dir.display()
                    );
                    return Ok(result);
                }
                ExtractionState::Failed(error) => {
                    log::warn!(
                        "Extraction into {} failed after {} frame(s): {error}",
                        output_dir.display(),
                        frames.len()
                    );
                    return Err(error);
                }
            };
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn decode_step<S>(
        &self,
        source: &mut S,
        ordinal: u64,
        output_dir: &Path,
        namer: &FrameNamer,
        writer: &mut FrameWriter,
        frames: &mut Vec<FrameDescriptor>,
        tracker: &mut ProgressTracker,
    ) -> ExtractionState
    where
        S: FrameSource + ?Sized,
    {
        if self.config.is_cancelled() {
            return ExtractionState::Failed(UnanimateError::Cancelled { completed: ordinal });
        }

        let mut frame = match source.next_frame() {
            Ok(FrameStep::Frame(frame)) => frame,
            Ok(FrameStep::EndOfSequence) => return ExtractionState::Completed,
            Err(error) => return ExtractionState::Failed(error),
        };
        // Names and descriptors follow the run's own count.
        frame.ordinal = ordinal;

        let filename = namer.name(ordinal);
        match writer.write(&frame, output_dir, &filename) {
            Ok(descriptor) => {
                frames.push(descriptor);
                tracker.advance(Some(ordinal));
                ExtractionState::Decoding {
                    ordinal: ordinal + 1,
                }
            }
            Err(error) => ExtractionState::Failed(error),
        }
    }
}

/// Extract every frame of `input_path` into `output_dir` as PNG files, on the
/// local filesystem with default settings.
///
/// `frame_prefix` may be empty or blank to use the `frame_0000.png` scheme.
///
/// # Errors
///
/// See [`ExtractionPipeline::run`].
pub fn run_extraction<P, Q>(
    input_path: P,
    output_dir: Q,
    frame_prefix: &str,
) -> Result<ExtractionResult, UnanimateError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    ExtractionPipeline::new(ExtractionConfig::new()).run(input_path, output_dir, Some(frame_prefix))
}
