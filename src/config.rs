//! Extraction configuration.
//!
//! [`ExtractionConfig`] is a builder that carries the output format, the
//! descriptor path prefix, progress callbacks, and cancellation tokens into
//! [`ExtractionPipeline`](crate::ExtractionPipeline) and
//! [`ArchiveBuilder`](crate::ArchiveBuilder). Nothing is read from
//! process-wide state, so independent runs can use independent settings.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use unanimate::{CancellationToken, ExtractionConfig, OutputFormat};
//!
//! let token = CancellationToken::new();
//! let config = ExtractionConfig::new()
//!     .with_output_format(OutputFormat::Png)
//!     .with_path_prefix("outputs")
//!     .with_cancellation(token.clone())
//!     .with_batch_size(10);
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use image::ImageFormat;

use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Still-image format every extracted frame is written in.
///
/// All variants are lossless and keep the alpha channel, so frames with
/// transparency are never flattened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Portable Network Graphics. This is the default.
    #[default]
    Png,
    /// 32-bit Windows bitmap.
    Bmp,
    /// Uncompressed TIFF.
    Tiff,
    /// Quite OK Image format.
    Qoi,
}

impl OutputFormat {
    /// Lowercase canonical file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Bmp => "bmp",
            OutputFormat::Tiff => "tiff",
            OutputFormat::Qoi => "qoi",
        }
    }

    /// Map to the corresponding `image` crate format.
    pub(crate) fn to_image_format(self) -> ImageFormat {
        match self {
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::Bmp => ImageFormat::Bmp,
            OutputFormat::Tiff => ImageFormat::Tiff,
            OutputFormat::Qoi => ImageFormat::Qoi,
        }
    }
}

/// Configuration for extraction and archive operations.
///
/// All fields have defaults: PNG output, no path prefix, no progress
/// callback, no cancellation, batch size 1.
#[derive(Clone)]
pub struct ExtractionConfig {
    pub(crate) output_format: OutputFormat,
    /// Leading component of every descriptor's `relative_path`.
    pub(crate) path_prefix: Option<String>,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
    /// How often to fire the progress callback (every N items).
    pub(crate) batch_size: u64,
}

impl Debug for ExtractionConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ExtractionConfig")
            .field("output_format", &self.output_format)
            .field("path_prefix", &self.path_prefix)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionConfig {
    /// Create a new configuration with default settings.
    pub fn new() -> Self {
        Self {
            output_format: OutputFormat::default(),
            path_prefix: None,
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            batch_size: 1,
        }
    }

    /// Set the still-image format frames are written in.
    #[must_use]
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Prepend `prefix` to every descriptor's `relative_path`.
    ///
    /// With prefix `outputs` and output directory `static/outputs/run1`,
    /// frame `frame_0000.png` gets the relative path
    /// `outputs/run1/frame_0000.png`. Leading and trailing slashes are
    /// stripped; an empty prefix clears it.
    #[must_use]
    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let trimmed = prefix.trim_matches('/');
        self.path_prefix = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token, checked before each frame.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Set how often the progress callback fires. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// The configured output format.
    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}
