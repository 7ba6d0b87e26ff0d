//! Archive builder integration tests.

mod common;

use std::{fs, io::Read, sync::Arc};

use unanimate::{
    ArchiveBuilder, ErrorKind, ExtractionConfig, ProgressCallback, ProgressInfo, build_archive,
    run_extraction,
};
use zip::{CompressionMethod, ZipArchive};

use common::{animated_gif, write_fixture};

fn entry_names(bytes: Vec<u8>) -> Vec<String> {
    let mut archive = ZipArchive::new(std::io::Cursor::new(bytes)).expect("Invalid archive");
    (0..archive.len())
        .map(|index| {
            archive
                .by_index(index)
                .expect("Missing entry")
                .name()
                .to_string()
        })
        .collect()
}

#[test]
fn entries_are_ordered_by_name() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let directory = temporary_directory.path();
    fs::write(directory.join("b.png"), b"second").unwrap();
    fs::write(directory.join("a.png"), b"first").unwrap();

    let stream = build_archive(directory).expect("Archive failed");
    assert_eq!(stream.position(), 0);
    assert_eq!(entry_names(stream.into_inner()), ["a.png", "b.png"]);
}

#[test]
fn subdirectories_are_skipped_and_names_are_bare() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let directory = temporary_directory.path();
    fs::create_dir(directory.join("nested")).unwrap();
    fs::write(directory.join("nested").join("c.png"), b"hidden").unwrap();
    fs::write(directory.join("frame_0000.png"), b"visible").unwrap();

    let stream = build_archive(directory).expect("Archive failed");
    assert_eq!(entry_names(stream.into_inner()), ["frame_0000.png"]);
}

#[test]
fn nonexistent_directory_is_not_found() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let error = build_archive(temporary_directory.path().join("nope")).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotFound);
}

#[test]
fn repeated_builds_are_byte_identical() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let input = write_fixture(temporary_directory.path(), "clip.gif", &animated_gif(3));
    let output = temporary_directory.path().join("out");
    run_extraction(&input, &output, "").expect("Extraction failed");

    let first = build_archive(&output).expect("First build failed").into_inner();
    let second = build_archive(&output).expect("Second build failed").into_inner();
    assert_eq!(first, second);
}

#[test]
fn archive_round_trips_extracted_frames() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let input = write_fixture(temporary_directory.path(), "clip.gif", &animated_gif(2));
    let output = temporary_directory.path().join("out");
    run_extraction(&input, &output, "clip").expect("Extraction failed");

    let stream = build_archive(&output).expect("Archive failed");
    let mut archive = ZipArchive::new(stream).expect("Invalid archive");
    assert_eq!(archive.len(), 2);

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).expect("Missing entry");
        assert_eq!(entry.compression(), CompressionMethod::Deflated);

        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).unwrap();
        let on_disk = fs::read(output.join(entry.name())).unwrap();
        assert_eq!(contents, on_disk);
    }
}

struct CountingProgress {
    totals: std::sync::Mutex<Vec<Option<u64>>>,
}

impl ProgressCallback for CountingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.totals.lock().unwrap().push(info.total);
    }
}

#[test]
fn archive_progress_knows_total() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let directory = temporary_directory.path();
    fs::write(directory.join("a.png"), b"a").unwrap();
    fs::write(directory.join("b.png"), b"b").unwrap();

    let progress = Arc::new(CountingProgress {
        totals: std::sync::Mutex::new(Vec::new()),
    });
    let builder = ArchiveBuilder::new(ExtractionConfig::new().with_progress(progress.clone()));
    builder.build(directory).expect("Archive failed");

    let totals = progress.totals.lock().unwrap();
    assert!(!totals.is_empty());
    assert!(totals.iter().all(|total| *total == Some(2)));
}
