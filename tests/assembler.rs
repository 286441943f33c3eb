//! Scene assembler and scene list output tests.

use scenecut::{
    BoundaryKind, SCENE_LIST_HEADER, SceneAssembler, SceneBoundary, SceneCutError, SceneList,
};

fn assemble(boundaries: &[(u64, BoundaryKind)], total: u64, fps: f64) -> Result<SceneList, SceneCutError> {
    let mut assembler = SceneAssembler::new();
    for &(frame, kind) in boundaries {
        assembler.push(SceneBoundary::new(frame, kind))?;
    }
    assembler.finish(total, fps)
}

// ── Assembly ───────────────────────────────────────────────────────

#[test]
fn no_boundaries_yield_one_scene() {
    let scenes = assemble(&[], 48, 24.0).unwrap();
    assert_eq!(scenes.frame_ranges(), vec![(0, 48)]);
    assert!(scenes.cut_frames().is_empty());
}

#[test]
fn cuts_split_into_contiguous_scenes() {
    let scenes = assemble(
        &[(3, BoundaryKind::Cut), (7, BoundaryKind::Cut)],
        10,
        25.0,
    )
    .unwrap();

    assert_eq!(scenes.frame_ranges(), vec![(0, 3), (3, 7), (7, 10)]);
    assert_eq!(scenes.cut_frames(), vec![3, 7]);
    let numbers: Vec<usize> = scenes.iter().map(|scene| scene.number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
}

#[test]
fn fade_pair_at_same_frame_closes_one_scene() {
    let scenes = assemble(
        &[(15, BoundaryKind::FadeOut), (15, BoundaryKind::FadeIn)],
        30,
        25.0,
    )
    .unwrap();

    assert_eq!(scenes.frame_ranges(), vec![(0, 15), (15, 30)]);
}

#[test]
fn boundary_at_frame_zero_is_absorbed() {
    let scenes = assemble(&[(0, BoundaryKind::Cut)], 5, 25.0).unwrap();
    assert_eq!(scenes.frame_ranges(), vec![(0, 5)]);
}

#[test]
fn zero_frames_yield_empty_list() {
    let scenes = assemble(&[], 0, 25.0).unwrap();
    assert!(scenes.is_empty());
    assert_eq!(scenes.len(), 0);
}

#[test]
fn boundary_before_current_start_is_rejected() {
    let mut assembler = SceneAssembler::new();
    assembler
        .push(SceneBoundary::new(10, BoundaryKind::Cut))
        .unwrap();

    let error = assembler
        .push(SceneBoundary::new(4, BoundaryKind::Cut))
        .unwrap_err();
    assert!(matches!(error, SceneCutError::AssemblyInvariantViolation(_)));
}

#[test]
fn boundary_at_stream_end_is_rejected() {
    let error = assemble(&[(10, BoundaryKind::Cut)], 10, 25.0).unwrap_err();
    assert!(matches!(error, SceneCutError::AssemblyInvariantViolation(_)));

    let error = assemble(&[(12, BoundaryKind::Cut)], 10, 25.0).unwrap_err();
    assert!(matches!(error, SceneCutError::AssemblyInvariantViolation(_)));
}

#[test]
fn scenes_carry_timecodes() {
    let scenes = assemble(&[(50, BoundaryKind::Cut)], 100, 25.0).unwrap();
    let second = &scenes.scenes()[1];

    assert_eq!(second.start.to_string(), "00:00:02.000");
    assert_eq!(second.end.to_string(), "00:00:04.000");
    assert_eq!(second.len_frames(), 50);
    assert_eq!(second.duration().as_millis(), 2000);
    assert_eq!(scenes.frames_per_second(), 25.0);
    assert_eq!(scenes.total_frames(), 100);
}

// ── Output ─────────────────────────────────────────────────────────

#[test]
fn csv_output_lists_every_scene() {
    let scenes = assemble(&[(3, BoundaryKind::Cut)], 6, 25.0).unwrap();

    let mut buffer = Vec::new();
    scenes.write_csv(&mut buffer).unwrap();
    let text = String::from_utf8(buffer).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], SCENE_LIST_HEADER);
    assert_eq!(lines[1], "1,0,00:00:00.000,3,00:00:00.120,3,0.120");
    assert_eq!(lines[2], "2,3,00:00:00.120,6,00:00:00.240,3,0.120");
    assert_eq!(lines.len(), 3);
}

#[test]
fn csv_file_is_overwritten() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let path = directory.path().join("scenes.csv");
    std::fs::write(&path, "stale contents\n".repeat(100)).unwrap();

    let scenes = assemble(&[], 10, 25.0).unwrap();
    scenes.save_csv(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), 2);
    assert!(!text.contains("stale"));
}

#[test]
fn json_output_describes_scenes() {
    let scenes = assemble(&[(25, BoundaryKind::Cut)], 50, 25.0).unwrap();
    let value = scenes.to_json();

    assert_eq!(value["total_frames"], 50);
    assert_eq!(value["scenes"].as_array().map(Vec::len), Some(2));
    assert_eq!(value["scenes"][1]["start_frame"], 25);
    assert_eq!(value["scenes"][1]["start_timecode"], "00:00:01.000");
    assert_eq!(value["scenes"][1]["length_frames"], 25);
}
