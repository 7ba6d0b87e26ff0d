//! In-memory ZIP packaging of an extraction's output directory.
//!
//! [`ArchiveBuilder`] reads the regular files in a directory, sorts them by
//! name, and deflates each into a ZIP archive built entirely in memory. No
//! temporary file is written, so builds against the same finished directory
//! can run repeatedly and concurrently. Entry timestamps and permissions are
//! fixed, which makes the archive byte-identical for identical inputs.
//!
//! # Example
//!
//! ```no_run
//! use std::io::Read;
//!
//! use unanimate::{ArchiveBuilder, ExtractionConfig, archive_file_name};
//!
//! let builder = ArchiveBuilder::new(ExtractionConfig::new());
//! let mut stream = builder.build("static/outputs/20240101_120000")?;
//! let mut bytes = Vec::new();
//! stream.read_to_end(&mut bytes)?;
//! std::fs::write(archive_file_name("20240101_120000"), bytes)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{
    io::{Cursor, Write},
    path::Path,
    sync::Arc,
};

use zip::{CompressionMethod, DateTime, ZipWriter, write::SimpleFileOptions};

use crate::{
    config::ExtractionConfig,
    error::UnanimateError,
    progress::{OperationType, ProgressTracker},
    storage::{FrameStore, LocalStore},
};

/// Download name for the archive of output folder `folder_name`.
pub fn archive_file_name(folder_name: &str) -> String {
    format!("frames_{folder_name}.zip")
}

/// Builds ZIP archives from output directories.
pub struct ArchiveBuilder {
    config: ExtractionConfig,
    store: Arc<dyn FrameStore>,
}

impl ArchiveBuilder {
    /// Builder reading from the local filesystem.
    pub fn new(config: ExtractionConfig) -> Self {
        Self::with_store(config, Arc::new(LocalStore))
    }

    /// Builder reading through a custom [`FrameStore`].
    pub fn with_store(config: ExtractionConfig, store: Arc<dyn FrameStore>) -> Self {
        Self { config, store }
    }

    /// Names of the entries an archive of `output_dir` would contain, in
    /// archive order.
    ///
    /// # Errors
    ///
    /// Returns [`UnanimateError::NotFound`] if `output_dir` is not a directory.
    pub fn entry_names(&self, output_dir: &Path) -> Result<Vec<String>, UnanimateError> {
        if !self.store.is_dir(output_dir) {
            return Err(UnanimateError::NotFound {
                path: output_dir.to_path_buf(),
            });
        }

        let mut names = self
            .store
            .list_files(output_dir)
            .map_err(|error| UnanimateError::from_io(output_dir, error))?;
        names.sort();
        Ok(names)
    }

    /// Build the archive and return its bytes.
    ///
    /// # Errors
    ///
    /// Returns [`UnanimateError::NotFound`] if `output_dir` is missing,
    /// [`UnanimateError::IoError`] if a file cannot be read, and
    /// [`UnanimateError::ArchiveError`] if the ZIP writer fails. No partial
    /// archive is returned on error.
    pub fn build_to_vec<P: AsRef<Path>>(&self, output_dir: P) -> Result<Vec<u8>, UnanimateError> {
        let output_dir = output_dir.as_ref();
        let names = self.entry_names(output_dir)?;

        let mut tracker = ProgressTracker::new(
            self.config.progress.clone(),
            OperationType::ArchiveBuild,
            Some(names.len() as u64),
            self.config.batch_size,
        );

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default())
            .unix_permissions(0o644);

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for name in &names {
            let path = output_dir.join(name);
            let contents = self
                .store
                .read_file(&path)
                .map_err(|error| UnanimateError::from_io(&path, error))?;

            zip.start_file(name.as_str(), options)?;
            zip.write_all(&contents)
                .map_err(|error| UnanimateError::ArchiveError(error.to_string()))?;
            tracker.advance(None);
        }
        let bytes = zip.finish()?.into_inner();
        tracker.finish();

        log::info!(
            "Archive built for {}: {} entries, {} bytes",
            output_dir.display(),
            names.len(),
            bytes.len()
        );
        Ok(bytes)
    }

    /// Build the archive as a seekable stream positioned at offset 0.
    ///
    /// # Errors
    ///
    /// See [`build_to_vec`](ArchiveBuilder::build_to_vec).
    pub fn build<P: AsRef<Path>>(&self, output_dir: P) -> Result<Cursor<Vec<u8>>, UnanimateError> {
        self.build_to_vec(output_dir).map(Cursor::new)
    }
}

/// Archive `output_dir` on the local filesystem with default settings.
///
/// # Errors
///
/// See [`ArchiveBuilder::build_to_vec`].
pub fn build_archive<P: AsRef<Path>>(output_dir: P) -> Result<Cursor<Vec<u8>>, UnanimateError> {
    ArchiveBuilder::new(ExtractionConfig::new()).build(output_dir)
}
