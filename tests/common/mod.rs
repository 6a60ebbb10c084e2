//! Shared fixture for the integration tests.
//!
//! The reference clip is 1 second of FFmpeg's `testsrc2` pattern at
//! 640x480 and 60 fps, encoded as H.264 in mp4 with a 1/9000 time base.
//! A second clip, 1 second of `testsrc2` at 320x240 and 30 fps in
//! matroska, is muxed to a pipe so it carries neither a duration nor a
//! frame count. Both are generated with the `ffmpeg` command-line tool on
//! first use; tests return early when that is not possible.

#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    process::{Command, Stdio},
    sync::OnceLock,
};

pub const WIDTH: u32 = 640;
pub const HEIGHT: u32 = 480;
pub const FRAME_COUNT: u64 = 60;
pub const TIME_BASE_DENOMINATOR: i32 = 9000;

pub const UNKNOWN_LENGTH_FRAMES: u64 = 30;
pub const UNKNOWN_LENGTH_RATE: i32 = 30;

/// How a fixture is encoded and where the encoder writes it.
struct Fixture {
    name: &'static str,
    arguments: &'static [&'static str],
    /// Mux to stdout so the muxer cannot seek back to write an index.
    piped: bool,
}

const REFERENCE: Fixture = Fixture {
    name: "testsrc2.mp4",
    arguments: &[
        "-f",
        "lavfi",
        "-i",
        "testsrc2=s=640x480:r=60:d=1,format=yuv420p",
        "-c:v",
        "libx264",
        "-g",
        "30",
        "-video_track_timescale",
        "9000",
    ],
    piped: false,
};

const UNKNOWN_LENGTH: Fixture = Fixture {
    name: "testsrc2_unknown_length.mkv",
    arguments: &[
        "-f",
        "lavfi",
        "-i",
        "testsrc2=s=320x240:r=30:d=1,format=yuv420p",
        "-c:v",
        "libx264",
        "-g",
        "15",
        "-bf",
        "0",
        "-f",
        "matroska",
    ],
    piped: true,
};

fn fixture_directory() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

fn generate(fixture: &Fixture, target: &Path) -> Result<(), String> {
    let directory = target.parent().ok_or("fixture path has no parent")?;
    std::fs::create_dir_all(directory).map_err(|error| error.to_string())?;

    // Write next to the target and rename, so concurrent test binaries never
    // observe a half-written file.
    let extension = target
        .extension()
        .and_then(|extension| extension.to_str())
        .unwrap_or("bin");
    let mut partial = tempfile::Builder::new()
        .prefix("testsrc2-")
        .suffix(&format!(".{extension}"))
        .tempfile_in(directory)
        .map_err(|error| error.to_string())?;

    let mut command = Command::new("ffmpeg");
    command
        .args(["-y", "-loglevel", "error"])
        .args(fixture.arguments);
    if fixture.piped {
        let output = partial.as_file_mut().try_clone().map_err(|error| error.to_string())?;
        command.arg("pipe:1").stdout(Stdio::from(output));
    } else {
        command.arg(partial.path());
    }

    let status = command
        .status()
        .map_err(|error| format!("cannot run ffmpeg: {error}"))?;

    if !status.success() {
        return Err(format!("ffmpeg exited with {status}"));
    }

    partial
        .persist(target)
        .map_err(|error| error.error.to_string())?;
    Ok(())
}

fn fixture_path(fixture: &Fixture) -> Option<PathBuf> {
    let target = fixture_directory().join(fixture.name);
    if target.exists() {
        return Some(target);
    }
    match generate(fixture, &target) {
        Ok(()) => Some(target),
        Err(reason) => {
            eprintln!("skipping: {} unavailable ({reason})", fixture.name);
            None
        }
    }
}

/// Path of the reference clip, generating it if needed. `None` when it
/// cannot be produced on this machine.
pub fn reference_clip() -> Option<&'static Path> {
    static CLIP: OnceLock<Option<PathBuf>> = OnceLock::new();
    CLIP.get_or_init(|| fixture_path(&REFERENCE)).as_deref()
}

/// Path of the clip without a duration or frame count.
pub fn unknown_length_clip() -> Option<&'static Path> {
    static CLIP: OnceLock<Option<PathBuf>> = OnceLock::new();
    CLIP.get_or_init(|| fixture_path(&UNKNOWN_LENGTH)).as_deref()
}

pub fn unknown_length_url() -> Option<&'static str> {
    unknown_length_clip().and_then(Path::to_str)
}

/// Reference clip path as the `&str` URL the library takes.
pub fn reference_url() -> Option<&'static str> {
    reference_clip().and_then(Path::to_str)
}
