//! Encoding and persisting single frames.

use std::{
    io::Cursor,
    path::{Path, PathBuf},
    sync::Arc,
};

use image::{ImageResult, RgbaImage};

use crate::{
    config::OutputFormat, decoder::RawFrame, error::UnanimateError, storage::FrameStore,
};

/// Where one extracted frame ended up.
///
/// `relative_path` is `[{path_prefix}/]{output_dir basename}/{filename}`,
/// always `/`-separated so it can be used as a URL path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameDescriptor {
    ordinal: u64,
    filename: String,
    relative_path: String,
}

impl FrameDescriptor {
    /// Zero-based ordinal of the frame in its container.
    pub fn ordinal(&self) -> u64 {
        self.ordinal
    }

    /// Bare output filename.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Output path relative to the service's public output root.
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }
}

/// Encodes frames into the configured output format and writes them through
/// a [`FrameStore`].
pub struct FrameWriter {
    store: Arc<dyn FrameStore>,
    format: OutputFormat,
    path_prefix: Option<String>,
    prepared_directory: Option<PathBuf>,
}

impl FrameWriter {
    pub fn new(
        store: Arc<dyn FrameStore>,
        format: OutputFormat,
        path_prefix: Option<String>,
    ) -> Self {
        Self {
            store,
            format,
            path_prefix,
            prepared_directory: None,
        }
    }

    /// Encode `frame` and write it to `output_dir/filename`.
    ///
    /// `output_dir` and its parents are created before the first write into
    /// it; creating an existing directory is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`UnanimateError::EncodeError`] if the frame cannot be encoded
    /// and [`UnanimateError::IoError`] if the directory or file cannot be
    /// written.
    pub fn write(
        &mut self,
        frame: &RawFrame,
        output_dir: &Path,
        filename: &str,
    ) -> Result<FrameDescriptor, UnanimateError> {
        self.ensure_directory(output_dir)?;

        let bytes = encode_frame(&frame.image, self.format).map_err(|error| {
            UnanimateError::EncodeError {
                ordinal: frame.ordinal,
                reason: error.to_string(),
            }
        })?;

        let path = output_dir.join(filename);
        self.store
            .write_file(&path, &bytes)
            .map_err(|source| UnanimateError::IoError {
                path: path.clone(),
                source,
            })?;
        log::debug!("Frame {} saved: {}", frame.ordinal, path.display());

        Ok(FrameDescriptor {
            ordinal: frame.ordinal,
            filename: filename.to_string(),
            relative_path: relative_path(self.path_prefix.as_deref(), output_dir, filename),
        })
    }

    /// Create `output_dir` unless this writer already did.
    pub fn ensure_directory(&mut self, output_dir: &Path) -> Result<(), UnanimateError> {
        if self.prepared_directory.as_deref() == Some(output_dir) {
            return Ok(());
        }
        self.store
            .create_dir_all(output_dir)
            .map_err(|source| UnanimateError::IoError {
                path: output_dir.to_path_buf(),
                source,
            })?;
        self.prepared_directory = Some(output_dir.to_path_buf());
        Ok(())
    }
}

/// Encode an RGBA frame in memory. The buffer is always written as RGBA8 so
/// alpha survives into the output file.
pub(crate) fn encode_frame(image: &RgbaImage, format: OutputFormat) -> ImageResult<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    image.write_to(&mut cursor, format.to_image_format())?;
    Ok(cursor.into_inner())
}

fn relative_path(prefix: Option<&str>, output_dir: &Path, filename: &str) -> String {
    let basename = output_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());

    [prefix.map(str::to_string), basename, Some(filename.to_string())]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;
    use crate::storage::MemoryStore;

    fn frame(ordinal: u64) -> RawFrame {
        let mut image = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 255]));
        image.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        image.put_pixel(1, 0, Rgba([200, 100, 50, 128]));
        RawFrame { ordinal, image }
    }

    #[test]
    fn relative_path_joins_prefix_basename_and_filename() {
        assert_eq!(
            relative_path(Some("outputs"), Path::new("static/outputs/run1"), "a.png"),
            "outputs/run1/a.png"
        );
        assert_eq!(relative_path(None, Path::new("run1"), "a.png"), "run1/a.png");
        assert_eq!(relative_path(None, Path::new("/"), "a.png"), "a.png");
    }

    #[test]
    fn writes_png_and_keeps_alpha() {
        let store = Arc::new(MemoryStore::new());
        let mut writer = FrameWriter::new(store.clone(), OutputFormat::Png, None);

        let descriptor = writer
            .write(&frame(3), Path::new("out/run"), "frame_0003.png")
            .unwrap();
        assert_eq!(descriptor.ordinal(), 3);
        assert_eq!(descriptor.filename(), "frame_0003.png");
        assert_eq!(descriptor.relative_path(), "run/frame_0003.png");

        let bytes = store.get("out/run/frame_0003.png").expect("frame written");
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.color(), image::ColorType::Rgba8);
        let rgba = decoded.to_rgba8();
        assert_eq!(rgba.get_pixel(0, 0)[3], 0);
        assert_eq!(rgba.get_pixel(1, 0), &Rgba([200, 100, 50, 128]));
    }

    #[test]
    fn io_failure_is_reported_with_path() {
        let store = Arc::new(MemoryStore::with_write_budget(0));
        let mut writer = FrameWriter::new(store, OutputFormat::Png, None);

        let error = writer
            .write(&frame(0), Path::new("out"), "frame_0000.png")
            .unwrap_err();
        match error {
            UnanimateError::IoError { path, .. } => {
                assert_eq!(path, PathBuf::from("out/frame_0000.png"));
            }
            other => panic!("Expected IoError, got: {other}"),
        }
    }

    #[test]
    fn lossless_formats_round_trip_pixels() {
        for format in [OutputFormat::Png, OutputFormat::Tiff, OutputFormat::Qoi] {
            let original = frame(0).image;
            let bytes = encode_frame(&original, format).unwrap();
            let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
            assert_eq!(decoded, original, "{format:?}");
        }
    }

    #[test]
    fn bmp_output_decodes() {
        let bytes = encode_frame(&frame(0).image, OutputFormat::Bmp).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (2, 2));
    }
}
