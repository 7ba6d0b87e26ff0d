//! Fixture helpers shared by the integration tests.
//!
//! Animated containers are synthesized at test time so the suite needs no
//! binary fixtures on disk.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use image::{Frame, Rgba, RgbaImage, codecs::gif::GifEncoder};

/// Encode `frame_count` solid-colour 8x6 frames as an animated GIF.
pub fn animated_gif(frame_count: u8) -> Vec<u8> {
    let frames = (0..frame_count).map(|index| {
        RgbaImage::from_pixel(8, 6, Rgba([index.wrapping_mul(50), 80, 160, 255]))
    });
    gif_from_images(frames)
}

/// Encode arbitrary RGBA images as an animated GIF.
pub fn gif_from_images(images: impl IntoIterator<Item = RgbaImage>) -> Vec<u8> {
    let mut buffer = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut buffer);
        encoder
            .encode_frames(images.into_iter().map(Frame::new))
            .expect("Failed to encode GIF fixture");
    }
    buffer
}

/// Write `bytes` to `directory/name` and return the path.
pub fn write_fixture(directory: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = directory.join(name);
    std::fs::write(&path, bytes).expect("Failed to write fixture");
    path
}

/// Sorted bare file names in `directory`.
pub fn file_names(directory: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(directory)
        .expect("Failed to read output directory")
        .map(|entry| {
            entry
                .expect("Failed to read entry")
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    names.sort();
    names
}
