//! Lazy, forward-only frame decoding for animated image containers.
//!
//! [`FrameDecoder`] opens a GIF, APNG, or animated WebP container and decodes
//! one frame per call to [`next_frame`](FrameSource::next_frame). Every frame
//! is normalized to 8-bit RGBA, whatever the container's native colour model,
//! so the writer never has to care about palettes or partial transparency.
//! Still images of any format the `image` crate understands decode as a
//! one-frame sequence.
//!
//! Exhaustion is reported as [`FrameStep::EndOfSequence`], never as an error;
//! a broken frame is reported as [`UnanimateError::FrameDecodeError`]. This is
//! what lets the pipeline tell a completed run from a failed one without
//! counting frames up front. A GIF whose stream stops cleanly after its last
//! complete frame, without the closing trailer byte, also ends the sequence.
//!
//! # Example
//!
//! ```no_run
//! use unanimate::{FrameDecoder, FrameSource, FrameStep};
//!
//! let mut decoder = FrameDecoder::open("input.gif")?;
//! while let FrameStep::Frame(frame) = decoder.next_frame()? {
//!     println!("frame {}: {}x{}", frame.ordinal, frame.image.width(), frame.image.height());
//! }
//! # Ok::<(), unanimate::UnanimateError>(())
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    fs::File,
    io::{self, BufRead, BufReader, Cursor, Read, Seek, SeekFrom},
    iter,
    path::{Path, PathBuf},
};

use image::{
    AnimationDecoder, DynamicImage, Frame, Frames, ImageFormat, ImageReader, RgbaImage,
    codecs::{gif::GifDecoder, png::PngDecoder, webp::WebPDecoder},
};

use crate::error::UnanimateError;

/// Container formats the decoder distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    /// GIF, animated or not.
    Gif,
    /// PNG; animated when it carries APNG chunks.
    Png,
    /// WebP, animated or not.
    WebP,
    /// Any other still-image format, decoded as a single frame.
    Other(ImageFormat),
}

impl ContainerFormat {
    /// Extensions accepted by [`is_supported_file_name`](ContainerFormat::is_supported_file_name)
    /// when no explicit allow-list is given.
    pub const DEFAULT_ALLOWED_EXTENSIONS: &'static [&'static str] = &["gif"];

    /// Identify a container from its leading bytes.
    pub fn from_magic(header: &[u8]) -> Option<Self> {
        image::guess_format(header).ok().map(Self::from_image_format)
    }

    /// Guess the container from a file name's extension (case-insensitive).
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let (_, extension) = file_name.rsplit_once('.')?;
        ImageFormat::from_extension(extension).map(Self::from_image_format)
    }

    /// Upload allow-list check: `file_name` has an extension, and that
    /// extension (case-insensitively) is in `allowed`.
    pub fn is_supported_file_name(file_name: &str, allowed: &[&str]) -> bool {
        file_name.rsplit_once('.').is_some_and(|(_, extension)| {
            allowed
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(extension))
        })
    }

    fn from_image_format(format: ImageFormat) -> Self {
        match format {
            ImageFormat::Gif => ContainerFormat::Gif,
            ImageFormat::Png => ContainerFormat::Png,
            ImageFormat::WebP => ContainerFormat::WebP,
            other => ContainerFormat::Other(other),
        }
    }
}

/// One decoded frame, normalized to 8-bit RGBA.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Zero-based position in the container's decode order.
    pub ordinal: u64,
    /// Full-canvas pixels of this frame.
    pub image: RgbaImage,
}

/// Result of asking a source for its next frame.
#[derive(Debug, Clone)]
pub enum FrameStep {
    /// A decoded frame.
    Frame(RawFrame),
    /// The container has no more frames. Not an error.
    EndOfSequence,
}

/// A forward-only source of raw frames.
///
/// Implemented by [`FrameDecoder`]; the pipeline only depends on this trait,
/// so it can be driven by any other source of frames.
pub trait FrameSource {
    /// Decode the next frame.
    ///
    /// Returns [`FrameStep::EndOfSequence`] once the source is exhausted, and
    /// keeps returning it afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`UnanimateError::FrameDecodeError`] when the frame at the
    /// current ordinal is corrupt.
    fn next_frame(&mut self) -> Result<FrameStep, UnanimateError>;
}

/// Frame decoder over an opened container.
///
/// The underlying file stays open for as long as the decoder is alive and is
/// closed when it is dropped, on success and failure paths alike. Sequences
/// are not restartable: open a new decoder to decode again.
pub struct FrameDecoder {
    source: PathBuf,
    format: ContainerFormat,
    frames: Frames<'static>,
    next_ordinal: u64,
    finished: bool,
    missing_trailer_at: Option<u64>,
}

impl Debug for FrameDecoder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FrameDecoder")
            .field("source", &self.source)
            .field("format", &self.format)
            .field("next_ordinal", &self.next_ordinal)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl FrameDecoder {
    /// Open the container at `path` and read its header.
    ///
    /// # Errors
    ///
    /// Returns [`UnanimateError::NotFound`] if `path` does not exist, and
    /// [`UnanimateError::DecodeError`] if the header is unreadable or the
    /// format is not recognised.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, UnanimateError> {
        let path = path.as_ref();
        log::debug!("Opening container: {}", path.display());

        let file = File::open(path).map_err(|error| UnanimateError::from_io(path, error))?;
        Self::from_reader(BufReader::new(file), path)
    }

    /// Open a container held in memory. `label` is only used in error
    /// messages.
    ///
    /// # Errors
    ///
    /// Returns [`UnanimateError::DecodeError`] if the header is unreadable.
    pub fn from_bytes(bytes: Vec<u8>, label: impl Into<PathBuf>) -> Result<Self, UnanimateError> {
        Self::from_reader(Cursor::new(bytes), label)
    }

    fn from_reader<R>(mut reader: R, label: impl Into<PathBuf>) -> Result<Self, UnanimateError>
    where
        R: BufRead + Seek + 'static,
    {
        let source = label.into();
        let decode_error = |reason: String| UnanimateError::DecodeError {
            path: source.clone(),
            reason,
        };

        let start = reader
            .stream_position()
            .map_err(|error| decode_error(error.to_string()))?;
        let probe = ImageReader::new(reader)
            .with_guessed_format()
            .map_err(|error| decode_error(error.to_string()))?;
        let image_format = probe
            .format()
            .ok_or_else(|| decode_error("unrecognised image format".to_string()))?;
        let format = ContainerFormat::from_image_format(image_format);
        let mut reader = probe.into_inner();

        let missing_trailer_at = match format {
            ContainerFormat::Gif => {
                let frames = gif_frames_without_trailer(&mut reader);
                reader
                    .seek(SeekFrom::Start(start))
                    .map_err(|error| decode_error(error.to_string()))?;
                frames
            }
            _ => None,
        };

        let frames =
            container_frames(reader, format).map_err(|error| decode_error(error.to_string()))?;
        log::debug!("Container {} opened as {format:?}", source.display());

        Ok(Self {
            source,
            format,
            frames,
            next_ordinal: 0,
            finished: false,
            missing_trailer_at,
        })
    }

    /// Detected container format.
    pub fn format(&self) -> ContainerFormat {
        self.format
    }

    /// Path (or label) the decoder was opened from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Number of frames successfully decoded so far.
    pub fn frames_decoded(&self) -> u64 {
        self.next_ordinal
    }
}

impl FrameSource for FrameDecoder {
    fn next_frame(&mut self) -> Result<FrameStep, UnanimateError> {
        if self.finished {
            return Ok(FrameStep::EndOfSequence);
        }

        match self.frames.next() {
            None => {
                self.finished = true;
                log::debug!(
                    "End of sequence for {} after {} frame(s)",
                    self.source.display(),
                    self.next_ordinal
                );
                Ok(FrameStep::EndOfSequence)
            }
            Some(Ok(frame)) => {
                let ordinal = self.next_ordinal;
                self.next_ordinal += 1;
                Ok(FrameStep::Frame(RawFrame {
                    ordinal,
                    image: frame.into_buffer(),
                }))
            }
            Some(Err(error)) => {
                // A decoder that failed mid-stream cannot be resumed.
                self.finished = true;
                if self.missing_trailer_at == Some(self.next_ordinal) {
                    log::warn!(
                        "{} ends without a trailer after {} frame(s)",
                        self.source.display(),
                        self.next_ordinal
                    );
                    return Ok(FrameStep::EndOfSequence);
                }
                Err(UnanimateError::FrameDecodeError {
                    ordinal: self.next_ordinal,
                    reason: error.to_string(),
                })
            }
        }
    }
}

impl Iterator for FrameDecoder {
    type Item = Result<RawFrame, UnanimateError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_frame() {
            Ok(FrameStep::Frame(frame)) => Some(Ok(frame)),
            Ok(FrameStep::EndOfSequence) => None,
            Err(error) => Some(Err(error)),
        }
    }
}

/// Build the lazy frame sequence for a container whose header has been
/// identified. Reading the header of animated formats happens here; frame
/// data is only decoded as the sequence is pulled.
fn container_frames<R>(reader: R, format: ContainerFormat) -> image::ImageResult<Frames<'static>>
where
    R: BufRead + Seek + 'static,
{
    match format {
        ContainerFormat::Gif => Ok(GifDecoder::new(reader)?.into_frames()),
        ContainerFormat::Png => {
            let decoder = PngDecoder::new(reader)?;
            if decoder.is_apng()? {
                Ok(decoder.apng()?.into_frames())
            } else {
                Ok(single_frame(move || DynamicImage::from_decoder(decoder)))
            }
        }
        ContainerFormat::WebP => {
            let decoder = WebPDecoder::new(reader)?;
            if decoder.has_animation() {
                Ok(decoder.into_frames())
            } else {
                Ok(single_frame(move || DynamicImage::from_decoder(decoder)))
            }
        }
        ContainerFormat::Other(image_format) => {
            let decoder = ImageReader::with_format(reader, image_format).into_decoder()?;
            Ok(single_frame(move || DynamicImage::from_decoder(decoder)))
        }
    }
}

fn single_frame<F>(decode: F) -> Frames<'static>
where
    F: FnOnce() -> image::ImageResult<DynamicImage> + 'static,
{
    Frames::new(Box::new(iter::once_with(move || {
        decode().map(|image| Frame::new(image.into_rgba8()))
    })))
}

/// Walk the block structure of a GIF stream without decoding pixel data.
///
/// Returns the number of complete images when the stream stops at a block
/// boundary without its `;` trailer. Returns `None` when the trailer is
/// present, when a block is cut short, or when the layout is not understood.
fn gif_frames_without_trailer<R: Read>(mut reader: R) -> Option<u64> {
    let mut screen = [0u8; 13];
    reader.read_exact(&mut screen).ok()?;
    skip_color_table(&mut reader, screen[10]).ok()?;

    let mut images = 0;
    loop {
        let mut introducer = [0u8; 1];
        match reader.read_exact(&mut introducer) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => return Some(images),
            Err(_) => return None,
        }

        match introducer[0] {
            b';' => return None,
            // Extension: label, then data sub-blocks.
            0x21 => {
                skip_bytes(&mut reader, 1).ok()?;
                skip_sub_blocks(&mut reader).ok()?;
            }
            // Image: descriptor, optional local palette, LZW code size, data.
            0x2C => {
                let mut descriptor = [0u8; 9];
                reader.read_exact(&mut descriptor).ok()?;
                skip_color_table(&mut reader, descriptor[8]).ok()?;
                skip_bytes(&mut reader, 1).ok()?;
                skip_sub_blocks(&mut reader).ok()?;
                images += 1;
            }
            _ => return None,
        }
    }
}

fn skip_color_table<R: Read>(reader: &mut R, flags: u8) -> io::Result<()> {
    if flags & 0x80 == 0 {
        return Ok(());
    }
    skip_bytes(reader, 3 << ((flags & 0x07) + 1))
}

fn skip_sub_blocks<R: Read>(reader: &mut R) -> io::Result<()> {
    loop {
        let mut size = [0u8; 1];
        reader.read_exact(&mut size)?;
        if size[0] == 0 {
            return Ok(());
        }
        skip_bytes(reader, u64::from(size[0]))?;
    }
}

fn skip_bytes<R: Read>(reader: &mut R, count: u64) -> io::Result<()> {
    let skipped = io::copy(&mut reader.by_ref().take(count), &mut io::sink())?;
    if skipped < count {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }
    Ok(())
}
