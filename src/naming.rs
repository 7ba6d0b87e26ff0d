//! Deterministic output filenames for extracted frames.
//!
//! A name depends only on the frame ordinal, the optional prefix, and the
//! configured output format. Re-running an extraction therefore produces the
//! same file set, and tests can predict names exactly.

use crate::config::OutputFormat;

/// Derives output filenames for one extraction run.
///
/// - With a prefix (non-empty after trimming whitespace):
///   `{prefix}_{ordinal + 1}.{ext}`, numbered from 1 for human-facing names.
/// - Otherwise: `frame_{ordinal:04}.{ext}`, numbered from 0. Ordinals past
///   9999 simply produce wider numbers.
///
/// # Example
///
/// ```
/// use unanimate::{FrameNamer, OutputFormat};
///
/// let default = FrameNamer::new(None, OutputFormat::Png);
/// assert_eq!(default.name(7), "frame_0007.png");
///
/// let custom = FrameNamer::new(Some(" logo "), OutputFormat::Png);
/// assert_eq!(custom.name(0), "logo_1.png");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameNamer {
    prefix: Option<String>,
    extension: &'static str,
}

impl FrameNamer {
    /// Create a namer. Blank prefixes fall back to the default scheme.
    pub fn new(prefix: Option<&str>, format: OutputFormat) -> Self {
        let prefix = prefix
            .map(str::trim)
            .filter(|prefix| !prefix.is_empty())
            .map(str::to_string);

        Self {
            prefix,
            extension: format.extension(),
        }
    }

    /// Filename for the frame at `ordinal`.
    pub fn name(&self, ordinal: u64) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}_{}.{}", ordinal + 1, self.extension),
            None => format!("frame_{ordinal:04}.{}", self.extension),
        }
    }

    /// The trimmed prefix in use, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }
}
