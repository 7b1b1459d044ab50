// NOTE: every test will complain about the functions it doesn't use
#![allow(unused)]

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use tempfile::TempDir;

/// Returns cargo's tmpdir
pub fn cargo_tmpdir() -> PathBuf {
    PathBuf::from(option_env!("CARGO_TARGET_TMPDIR").expect("no cargo tmpdir???"))
}

/// Returns a temporary directory inside cargo's tmpdir
pub fn tmp_dir() -> TempDir {
    TempDir::new_in(cargo_tmpdir()).expect("could not create temporary dir")
}

/// Writes a frame where the first `top` rows are `upper` and the rest `lower`.
pub fn split_frame(path: impl AsRef<Path>, top: u32, upper: [u8; 3], lower: [u8; 3]) {
    let path = path.as_ref();
    std::fs::create_dir_all(path.parent().expect("has a parent"))
        .expect("could not create the frame dir");
    RgbImage::from_fn(10, 10, |_, y| if y < top { Rgb(upper) } else { Rgb(lower) })
        .save(path)
        .expect("could not save the frame");
}
