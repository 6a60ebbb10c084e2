//! `StreamProbe` integration tests.

mod common;

use frameseek::{FrameSeekError, StreamOptions, StreamProbe, VideoStream};

#[test]
fn probe_matches_open_stream() {
    let Some(url) = common::reference_url() else {
        return;
    };

    let probed = StreamProbe::probe(url).expect("Failed to probe reference clip");
    let stream = VideoStream::open(url).expect("Failed to open reference clip");

    assert_eq!(&probed, stream.metadata());
}

#[test]
fn probe_with_options_applies_container_hint() {
    let Some(url) = common::reference_url() else {
        return;
    };

    let options = StreamOptions::new().with_container_type("mkv");
    let error = StreamProbe::probe_with_options(url, &options).unwrap_err();
    assert!(matches!(error, FrameSeekError::UnsupportedContainer { .. }));
}

#[test]
fn probe_many_reports_each_input() {
    let Some(url) = common::reference_url() else {
        return;
    };

    let results = StreamProbe::probe_many(&[url, "missing_clip.mp4"]);
    assert_eq!(results.len(), 2);
    assert_eq!(
        results[0].as_ref().expect("first probe should succeed").total_frames,
        common::FRAME_COUNT
    );
    assert!(matches!(results[1], Err(FrameSeekError::FileNotFound { .. })));
}

#[test]
fn available_accelerators_have_names() {
    for name in frameseek::available_accelerators() {
        assert!(!name.is_empty());
        assert_eq!(name, name.trim());
    }
}

#[test]
fn unadvertised_accelerator_rejected_without_a_device() {
    let Some(url) = common::reference_url() else {
        return;
    };

    let options = StreamOptions::new().with_accelerator("drm");
    let error = StreamProbe::probe_with_options(url, &options).unwrap_err();
    assert!(error.is_unsupported_hardware(), "expected UnsupportedHardware, got {error:?}");
}

#[test]
fn codec_parameters_give_size_and_format() {
    let Some(url) = common::reference_url() else {
        return;
    };

    let metadata = StreamProbe::probe(url).expect("Failed to probe reference clip");
    assert_eq!((metadata.width, metadata.height), (common::WIDTH, common::HEIGHT));
    assert_eq!(metadata.native_pixel_format, "yuv420p");
    assert_eq!(metadata.hardware_accelerator, None);
}
