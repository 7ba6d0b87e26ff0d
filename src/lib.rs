//! # unanimate
//!
//! Unanimate animated images: extract every frame of a GIF, APNG, or
//! animated WebP as an independent still image, and bundle the results into
//! a ZIP archive.
//!
//! `unanimate` decodes frames lazily through the
//! [`image`](https://crates.io/crates/image) crate, normalizes each one to
//! 8-bit RGBA, writes it under a deterministic name, and can later pack the
//! output directory into an in-memory, deflate-compressed archive.
//!
//! ## Quick Start
//!
//! ### Extract Every Frame
//!
//! ```no_run
//! use unanimate::run_extraction;
//!
//! let result = run_extraction("dance.gif", "frames/dance", "").unwrap();
//! // frames/dance/frame_0000.png, frames/dance/frame_0001.png, ...
//! println!("{} frames", result.total_frames());
//! ```
//!
//! ### Custom Names and Settings
//!
//! ```no_run
//! use unanimate::{ExtractionConfig, ExtractionPipeline, OutputFormat};
//!
//! let config = ExtractionConfig::new()
//!     .with_output_format(OutputFormat::Png)
//!     .with_path_prefix("outputs");
//! let pipeline = ExtractionPipeline::new(config);
//!
//! // frames/logo/logo_1.png, frames/logo/logo_2.png, ...
//! let result = pipeline.run("logo.gif", "frames/logo", Some("logo")).unwrap();
//! println!("{}", result.to_json());
//! ```
//!
//! ### Archive the Output
//!
//! ```no_run
//! use unanimate::build_archive;
//!
//! let stream = build_archive("frames/dance").unwrap();
//! std::fs::write("frames_dance.zip", stream.into_inner()).unwrap();
//! ```
//!
//! ## Features
//!
//! - **Lazy decoding**: frames are decoded one at a time; end of sequence is
//!   a normal signal, distinct from a corrupt frame
//! - **Alpha-preserving output**: every frame is written as RGBA8 in a
//!   lossless format (PNG by default; BMP, TIFF, QOI available)
//! - **Deterministic names**: `frame_0000.png` or `{prefix}_1.png`
//! - **Partial results**: a fault partway through keeps the frames already
//!   written
//! - **Reproducible archives**: sorted entries, fixed timestamps, built in
//!   memory
//! - **Pluggable storage**: [`FrameStore`] with a real and an in-memory
//!   implementation
//! - **Progress & cancellation**: [`ProgressCallback`] and
//!   [`CancellationToken`], checked between frames

pub mod archive;
pub mod config;
pub mod decoder;
pub mod error;
pub mod naming;
pub mod pipeline;
pub mod progress;
pub mod storage;
pub mod writer;

pub use archive::{ArchiveBuilder, archive_file_name, build_archive};
pub use config::{ExtractionConfig, OutputFormat};
pub use decoder::{ContainerFormat, FrameDecoder, FrameSource, FrameStep, RawFrame};
pub use error::{ErrorKind, UnanimateError};
pub use naming::FrameNamer;
pub use pipeline::{ExtractionPipeline, ExtractionResult, run_extraction};
pub use progress::{CancellationToken, OperationType, ProgressCallback, ProgressInfo};
pub use storage::{FrameStore, LocalStore, MemoryStore};
pub use writer::{FrameDescriptor, FrameWriter};
