//! Failure, retention, cancellation, and isolation tests.
//!
//! Mid-sequence faults are injected with a scripted [`FrameSource`], so the
//! ordinal of the failure is exact.

mod common;

use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
    sync::Arc,
    thread,
};

use image::{Rgba, RgbaImage};
use unanimate::{
    CancellationToken, ErrorKind, ExtractionConfig, ExtractionPipeline, FrameDecoder,
    FrameSource, FrameStep, FrameStore, MemoryStore, RawFrame, UnanimateError,
};

use common::{animated_gif, file_names, write_fixture};

/// Yields `good` frames, then fails with a frame decode error.
struct FailsAt {
    remaining: VecDeque<RawFrame>,
    fail_ordinal: u64,
}

impl FailsAt {
    fn new(good: u64) -> Self {
        let remaining = (0..good)
            .map(|ordinal| RawFrame {
                ordinal,
                image: RgbaImage::from_pixel(2, 2, Rgba([ordinal as u8, 0, 0, 255])),
            })
            .collect();
        Self {
            remaining,
            fail_ordinal: good,
        }
    }
}

impl FrameSource for FailsAt {
    fn next_frame(&mut self) -> Result<FrameStep, UnanimateError> {
        match self.remaining.pop_front() {
            Some(frame) => Ok(FrameStep::Frame(frame)),
            None => Err(UnanimateError::FrameDecodeError {
                ordinal: self.fail_ordinal,
                reason: "LZW stream truncated".to_string(),
            }),
        }
    }
}

// ── retention ──────────────────────────────────────────────────────

#[test]
fn fault_at_ordinal_two_keeps_first_two_frames_on_disk() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let output = temporary_directory.path().join("out");
    let pipeline = ExtractionPipeline::new(ExtractionConfig::new());

    let error = pipeline
        .run_source(&mut FailsAt::new(2), &output, None)
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::FrameDecodeError);
    assert_eq!(error.ordinal(), Some(2));
    assert_eq!(file_names(&output), ["frame_0000.png", "frame_0001.png"]);

    for name in ["frame_0000.png", "frame_0001.png"] {
        let image = image::open(output.join(name)).expect("Retained frame should decode");
        assert_eq!((image.width(), image.height()), (2, 2));
    }
}

#[test]
fn write_failure_keeps_earlier_frames() {
    let store = Arc::new(MemoryStore::with_write_budget(2));
    let pipeline = ExtractionPipeline::with_store(ExtractionConfig::new(), store.clone());

    let mut decoder =
        FrameDecoder::from_bytes(animated_gif(4), "clip.gif").expect("Failed to open fixture");
    let error = pipeline
        .run_source(&mut decoder, "out/run", Some("clip"))
        .unwrap_err();

    match &error {
        UnanimateError::IoError { path, .. } => {
            assert_eq!(path, &PathBuf::from("out/run/clip_3.png"));
        }
        other => panic!("Expected IoError, got: {other}"),
    }
    assert_eq!(
        store.file_paths(),
        vec![
            PathBuf::from("out/run/clip_1.png"),
            PathBuf::from("out/run/clip_2.png"),
        ]
    );
}

#[test]
fn truncated_gif_fails_at_the_cut_frame() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let mut bytes = animated_gif(3);
    // Drop the trailer, the block terminator, and the last byte of frame 2's data.
    bytes.truncate(bytes.len() - 3);
    let input = write_fixture(temporary_directory.path(), "cut.gif", &bytes);
    let output = temporary_directory.path().join("out");

    let error = unanimate::run_extraction(&input, &output, "").unwrap_err();

    assert_eq!(error.kind(), ErrorKind::FrameDecodeError);
    assert_eq!(error.ordinal(), Some(2));
    assert_eq!(file_names(&output), ["frame_0000.png", "frame_0001.png"]);
    for name in ["frame_0000.png", "frame_0001.png"] {
        let image = image::open(output.join(name)).expect("Retained frame should decode");
        assert_eq!((image.width(), image.height()), (8, 6));
    }
}

// ── cancellation ───────────────────────────────────────────────────

#[test]
fn cancelled_run_writes_nothing_more() {
    let token = CancellationToken::new();
    token.cancel();

    let store = Arc::new(MemoryStore::new());
    let config = ExtractionConfig::new().with_cancellation(token);
    let pipeline = ExtractionPipeline::with_store(config, store.clone());

    let mut decoder =
        FrameDecoder::from_bytes(animated_gif(3), "clip.gif").expect("Failed to open fixture");
    let error = pipeline.run_source(&mut decoder, "out", None).unwrap_err();

    match error {
        UnanimateError::Cancelled { completed } => assert_eq!(completed, 0),
        other => panic!("Expected Cancelled, got: {other}"),
    }
    assert!(store.file_paths().is_empty());
}

// ── isolation ──────────────────────────────────────────────────────

#[test]
fn concurrent_runs_into_distinct_directories() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let root = temporary_directory.path();
    let input = write_fixture(root, "clip.gif", &animated_gif(3));
    let pipeline = ExtractionPipeline::new(ExtractionConfig::new());

    let outputs: Vec<PathBuf> = (0..4).map(|index| root.join(format!("run{index}"))).collect();
    thread::scope(|scope| {
        for output in &outputs {
            let pipeline = &pipeline;
            let input = input.as_path();
            scope.spawn(move || {
                let result = pipeline.run(input, output, None).expect("Run failed");
                assert_eq!(result.total_frames(), 3);
            });
        }
    });

    for output in &outputs {
        assert_eq!(
            file_names(output),
            ["frame_0000.png", "frame_0001.png", "frame_0002.png"]
        );
    }
}

#[test]
fn memory_store_run_touches_no_disk() {
    let store = Arc::new(MemoryStore::new());
    let pipeline = ExtractionPipeline::with_store(ExtractionConfig::new(), store.clone());

    let mut decoder =
        FrameDecoder::from_bytes(animated_gif(2), "clip.gif").expect("Failed to open fixture");
    let result = pipeline
        .run_source(&mut decoder, "virtual/run", None)
        .expect("Extraction failed");

    assert_eq!(result.total_frames(), 2);
    assert!(store.is_dir(Path::new("virtual/run")));
    assert!(!Path::new("virtual").exists());
}
