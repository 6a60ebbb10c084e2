//! Frame buffer and timestamp integration tests against the reference clip.

mod common;

use frameseek::{FrameSeekError, Rational, StreamOptions, VideoStream};

fn open_reference() -> Option<VideoStream> {
    let url = common::reference_url()?;
    Some(VideoStream::open(url).expect("Failed to open reference clip"))
}

#[test]
fn frame_buffer_has_rgb24_length() {
    let Some(mut stream) = open_reference() else {
        return;
    };

    let expected = (common::WIDTH * common::HEIGHT * 3) as usize;
    assert_eq!(stream.frame_buffer(0).expect("frame 0").len(), expected);
    assert_eq!(stream.frame_buffer(59).expect("frame 59").len(), expected);
}

#[test]
fn frame_buffer_out_of_range() {
    let Some(mut stream) = open_reference() else {
        return;
    };

    for index in [60, 61, 10_000, -1, i64::MIN] {
        let error = stream.frame_buffer(index).unwrap_err();
        assert!(
            matches!(error, FrameSeekError::IndexOutOfRange { .. }),
            "index {index}: expected IndexOutOfRange, got {error:?}"
        );
        assert!(error.to_string().contains("out of range"));
    }

    // A failed request leaves the stream usable.
    assert!(stream.frame_buffer(10).is_ok());
}

#[test]
fn timestamp_out_of_range() {
    let Some(mut stream) = open_reference() else {
        return;
    };

    for index in [60, -1] {
        let error = stream.timestamp(index).unwrap_err();
        assert!(error.is_out_of_range(), "index {index}: got {error:?}");
    }
}

#[test]
fn repeated_requests_are_byte_identical() {
    let Some(mut stream) = open_reference() else {
        return;
    };

    let first = stream.frame_buffer(17).expect("frame 17").to_vec();
    let again = stream.frame_buffer(17).expect("frame 17 again").to_vec();
    assert_eq!(first, again);

    stream.frame_buffer(45).expect("frame 45");
    let after_jump = stream.frame_buffer(17).expect("frame 17 after jump").to_vec();
    assert_eq!(first, after_jump);
}

#[test]
fn neighbouring_frames_differ() {
    let Some(mut stream) = open_reference() else {
        return;
    };

    // testsrc2 animates every frame.
    let first = stream.frame_buffer(3).expect("frame 3").to_vec();
    let second = stream.frame_buffer(4).expect("frame 4").to_vec();
    assert_ne!(first, second);
}

#[test]
fn timestamps_follow_the_frame_rate() {
    let Some(mut stream) = open_reference() else {
        return;
    };

    let (ticks, time_base) = stream.timestamp(0).expect("timestamp 0").into_parts();
    assert_eq!(time_base, Rational(1, common::TIME_BASE_DENOMINATOR));

    // 60 fps in a 1/9000 time base is 150 ticks per frame.
    let (ticks_one, _) = stream.timestamp(1).expect("timestamp 1").into_parts();
    assert_eq!(ticks_one - ticks, 150);

    let last = stream.timestamp(59).expect("timestamp 59");
    assert!((last.seconds() - ticks as f64 / 9000.0 - 59.0 / 60.0).abs() < 1e-9);
}

#[test]
fn timestamps_strictly_increase() {
    let Some(mut stream) = open_reference() else {
        return;
    };

    let mut previous = None;
    for index in 0..common::FRAME_COUNT as i64 {
        let timestamp = stream.timestamp(index).expect("timestamp");
        if let Some(previous) = previous {
            assert!(timestamp > previous, "timestamp {index} did not increase");
        }
        previous = Some(timestamp);
    }
}

#[test]
fn timestamp_does_not_decode() {
    let Some(mut stream) = open_reference() else {
        return;
    };

    stream.timestamp(42).expect("timestamp 42");
    let stats = stream.decode_stats();
    assert_eq!(stats.seeks, 0);
    assert_eq!(stats.frames_decoded, 0);
}

#[test]
fn reload_buffer_repeats_last_frame_without_decoding() {
    let Some(mut stream) = open_reference() else {
        return;
    };

    assert!(stream.reload_buffer().is_none());

    let frame = stream.frame_buffer(25).expect("frame 25").to_vec();
    let stats = stream.decode_stats();

    let reloaded = stream.reload_buffer().expect("buffer after decode").to_vec();
    assert_eq!(reloaded, frame);
    assert_eq!(stream.decode_stats(), stats);
}

#[test]
fn sequential_scrub_matches_random_access() {
    let Some(url) = common::reference_url() else {
        return;
    };

    let mut sequential = VideoStream::open(url).expect("Failed to open reference clip");
    let mut random = VideoStream::open_with_options(
        url,
        &StreamOptions::new().with_forward_window(0),
    )
    .expect("Failed to open reference clip");

    let mut sequential_frames = Vec::new();
    for index in 0..common::FRAME_COUNT as i64 {
        sequential_frames.push(sequential.frame_buffer(index).expect("sequential").to_vec());
    }

    // Sequential stepping should need a single seek.
    assert_eq!(sequential.decode_stats().seeks, 1);

    for index in [59_i64, 0, 31, 30, 29, 58, 1] {
        let pixels = random.frame_buffer(index).expect("random");
        assert_eq!(
            pixels,
            sequential_frames[index as usize].as_slice(),
            "frame {index} differs between sequential and random access"
        );
    }
}

#[test]
fn frame_image_and_save() {
    let Some(mut stream) = open_reference() else {
        return;
    };

    let image = stream.frame_image(12).expect("frame image");
    assert_eq!(image.dimensions(), (common::WIDTH, common::HEIGHT));
    assert_eq!(image.as_raw().as_slice(), stream.reload_buffer().expect("buffer"));

    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let output = temporary_directory.path().join("frame_12.png");
    stream.save_frame(12, &output).expect("save frame");

    let decoded = image::open(&output).expect("read back png").to_rgb8();
    assert_eq!(decoded.as_raw(), image.as_raw());
}
