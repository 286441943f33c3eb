//! Stats file format and replay planning tests.

use std::time::Duration;

use scenecut::{DetectionMode, DetectorConfig, MetricRow, SceneCutError, StatsFile, StatsHeader};

fn content_file(rows: u64) -> StatsFile {
    let header = StatsHeader::for_config(&DetectorConfig::content_mode(), 25.0);
    let mut file = StatsFile::new(header);
    for frame in 0..rows {
        file.record(&MetricRow::content(
            frame,
            Duration::ZERO,
            frame as f64,
            0.5,
            2.0,
        ));
    }
    file
}

fn render(file: &StatsFile) -> String {
    let mut buffer = Vec::new();
    file.write(&mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

// ── Format ─────────────────────────────────────────────────────────

#[test]
fn written_file_has_identity_and_column_lines() {
    let text = render(&content_file(2));
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "Detector,content,Frame Rate,25.000000,Sampling,full");
    assert_eq!(
        lines[1],
        "Frame Number,Timecode,content_val,delta_hue,delta_sat,delta_lum"
    );
    assert_eq!(lines[2], "0,00:00:00.000,0.8333333333333334,0,0.5,2");
    assert_eq!(lines[3], "1,00:00:00.040,1.1666666666666667,1,0.5,2");
}

#[test]
fn threshold_header_records_sampling() {
    let config = DetectorConfig::threshold_mode()
        .with_block_size(4)
        .with_threshold(16.0);
    let file = StatsFile::new(StatsHeader::for_config(&config, 23.976));

    let text = render(&file);
    assert_eq!(
        text.lines().next(),
        Some("Detector,threshold,Frame Rate,23.976000,Sampling,b=4;t=16")
    );
    assert_eq!(
        text.lines().nth(1),
        Some("Frame Number,Timecode,avg_intensity,dark_fraction")
    );
}

#[test]
fn saved_file_loads_back() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let path = directory.path().join("video.stats.csv");
    let original = content_file(12);

    original.save(&path).unwrap();
    let loaded = StatsFile::load(&path).unwrap();

    assert_eq!(loaded, original);
    assert_eq!(loaded.header().mode(), DetectionMode::Content);
    assert_eq!(loaded.header().sampling(), "full");
    assert_eq!(loaded.rows()[11].frame, 11);
}

#[test]
fn blank_lines_are_skipped() {
    let text = "\nDetector,content,Frame Rate,25.000000,Sampling,full\n\n\
                Frame Number,Timecode,content_val,delta_hue,delta_sat,delta_lum\n\
                0,00:00:00.000,0,0,0,0\n\n\
                1,00:00:00.040,1,1,1,1\n\n";
    let file = StatsFile::read(text.as_bytes()).unwrap();
    assert_eq!(file.len(), 2);
}

#[test]
fn quoted_and_padded_fields_parse() {
    let text = "\"Detector\",\"content\",\"Frame Rate\",\"25.000000\",\"Sampling\",\"full\"\n\
                Frame Number, Timecode, content_val, delta_hue, delta_sat, delta_lum\n   \n\
                \"0\",\"00:00:00.000\", 0 , 0 , 0 , 0\n";
    let file = StatsFile::read(text.as_bytes()).unwrap();

    assert_eq!(file.header().frames_per_second(), 25.0);
    assert_eq!(file.len(), 1);
    assert_eq!(file.rows()[0].values, vec![0.0; 4]);
}

#[test]
fn malformed_files_are_corrupt() {
    let cases = [
        "",
        "Detector,content\n",
        "Detector,unknown,Frame Rate,25,Sampling,full\nFrame Number,Timecode\n",
        "Detector,content,Frame Rate,0,Sampling,full\nFrame Number,Timecode\n",
        "Detector,content,Frame Rate,25,Sampling,full\n",
        "Detector,content,Frame Rate,25,Sampling,full\nFrame,Time,content_val\n",
        "Detector,content,Frame Rate,25,Sampling,full\nFrame Number,Timecode,content_val\nx,00:00:00.000,1\n",
        "Detector,content,Frame Rate,25,Sampling,full\nFrame Number,Timecode,content_val\n0,00:00:00.000,abc\n",
    ];

    for text in cases {
        let error = StatsFile::read(text.as_bytes()).unwrap_err();
        assert!(
            matches!(error, SceneCutError::StatsFileCorrupt(_)),
            "expected corrupt error for {text:?}, got {error:?}"
        );
    }
}

#[test]
fn missing_file_is_io_error() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let error = StatsFile::load(directory.path().join("absent.csv")).unwrap_err();
    assert!(matches!(error, SceneCutError::IoError(_)));
}

// ── Replay planning ────────────────────────────────────────────────

#[test]
fn replay_plan_keeps_every_consecutive_row() {
    let file = content_file(20);
    let expected = StatsHeader::for_config(&DetectorConfig::content_mode(), 25.0);

    let rows = file.replay_plan(&expected).unwrap();

    assert_eq!(rows.len(), 20);
    assert_eq!(rows[7].frame(), 7);
    assert_eq!(rows[7].get("delta_hue"), Some(7.0));
    assert_eq!(rows[7].timestamp(), Duration::from_millis(280));
}

#[test]
fn replay_timestamps_come_from_frame_numbers() {
    let text = "Detector,content,Frame Rate,25.000000,Sampling,full\n\
                Frame Number,Timecode,content_val,delta_hue,delta_sat,delta_lum\n\
                0,99:99:99.999,0,0,0,0\n\
                1,not a timecode,1,1,1,1\n";
    let file = StatsFile::read(text.as_bytes()).unwrap();
    let expected = StatsHeader::for_config(&DetectorConfig::content_mode(), 25.0);

    let rows = file.replay_plan(&expected).unwrap();

    assert_eq!(rows[0].timestamp(), Duration::ZERO);
    assert_eq!(rows[1].timestamp(), Duration::from_millis(40));
}

#[test]
fn replay_plan_tolerates_rounded_frame_rate() {
    let config = DetectorConfig::content_mode();
    let file = StatsFile::new(StatsHeader::for_config(&config, 29.97));

    let close = StatsHeader::for_config(&config, 30_000.0 / 1_001.0);
    assert!(file.replay_plan(&close).is_ok());

    let far = StatsHeader::for_config(&config, 30.0);
    let error = file.replay_plan(&far).unwrap_err();
    assert!(matches!(error, SceneCutError::StatsReplayMismatch(_)));
}

#[test]
fn replay_plan_rejects_other_mode_or_sampling() {
    let threshold = DetectorConfig::threshold_mode();
    let file = StatsFile::new(StatsHeader::for_config(&threshold, 25.0));

    let content = StatsHeader::for_config(&DetectorConfig::content_mode(), 25.0);
    assert!(matches!(
        file.replay_plan(&content),
        Err(SceneCutError::StatsReplayMismatch(_))
    ));

    let coarser = StatsHeader::for_config(&threshold.clone().with_block_size(16), 25.0);
    assert!(matches!(
        file.replay_plan(&coarser),
        Err(SceneCutError::StatsReplayMismatch(_))
    ));

    let relaxed = StatsHeader::for_config(&threshold.with_min_percent(50.0), 25.0);
    assert!(file.replay_plan(&relaxed).is_ok());
}

#[test]
fn replay_plan_rejects_missing_column() {
    let text = "Detector,content,Frame Rate,25.000000,Sampling,full\n\
                Frame Number,Timecode,content_val,delta_hue\n\
                0,00:00:00.000,0,0\n";
    let file = StatsFile::read(text.as_bytes()).unwrap();
    let expected = StatsHeader::for_config(&DetectorConfig::content_mode(), 25.0);

    assert!(matches!(
        file.replay_plan(&expected),
        Err(SceneCutError::StatsReplayMismatch(_))
    ));
}

#[test]
fn replay_plan_needs_frame_zero() {
    let text = "Detector,content,Frame Rate,25.000000,Sampling,full\n\
                Frame Number,Timecode,content_val,delta_hue,delta_sat,delta_lum\n\
                5,00:00:00.200,1,1,1,1\n";
    let file = StatsFile::read(text.as_bytes()).unwrap();
    let expected = StatsHeader::for_config(&DetectorConfig::content_mode(), 25.0);

    assert!(file.replay_plan(&expected).unwrap().is_empty());
}
