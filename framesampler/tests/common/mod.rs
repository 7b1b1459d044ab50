// NOTE: every test will complain about the functions it doesn't use
#![allow(unused)]

use std::{path::PathBuf, process::Stdio};

use tempfile::TempDir;

/// Returns cargo's tmpdir
pub fn cargo_tmpdir() -> PathBuf {
    PathBuf::from(option_env!("CARGO_TARGET_TMPDIR").expect("no cargo tmpdir???"))
}

/// Returns a temporary directory inside cargo's tmpdir
pub fn tmp_dir() -> TempDir {
    TempDir::new_in(cargo_tmpdir()).expect("could not create temporary dir")
}

pub const TEST_VIDEO_LENGTH_SEC: u64 = 10;

/// A 10 second, 25 fps test pattern, created once per test binary.
pub fn create_test_video() -> PathBuf {
    let tmpvideo = cargo_tmpdir().join("Supernatural.S02E07.mkv");

    use std::sync::Once;
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::fs::remove_file(&tmpvideo).ok();
        std::process::Command::new("ffmpeg")
            .args([
                "-f",
                "lavfi",
                "-i",
                "testsrc=duration=10:rate=25",
                tmpvideo.as_os_str().to_str().expect("no probs, probably"),
            ])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .stdin(Stdio::null())
            .status()
            .expect("failed to execute ffmpeg");
    });

    tmpvideo
}
