//! End-to-end tests for the recording pipeline
//!
//! Raw bytes go through the capture channel, the tokenizer, and the ingest
//! pipeline, and come out as step-curve blocks merged into a track.

use midicurve::{
    create_chunk_channel, push_raw, BlockArena, CurveChannel, CurveType, MergePolicy, Recorder,
    TimedBlock, Track,
};

fn armed_track(port: usize, controller: u8) -> Track {
    let mut track = Track::new("rec");
    track.record_armed = true;
    track.input_port = Some(port);
    track.msb_controller = controller;
    track
}

#[test]
fn test_cc_bytes_become_one_token_block() {
    let (mut tx, rx) = create_chunk_channel(16);
    let mut recorder = Recorder::new(rx);
    let mut arena = BlockArena::new();
    let mut tracks = vec![armed_track(0, 7)];

    recorder.begin_pass(&mut tracks);
    push_raw(&mut tx, 0, 0, &[0xB0, 0x07, 0x40]);
    recorder.commit(&mut arena, &mut tracks);

    assert_eq!(tracks[0].block_count(), 1);
    let (_, block) = tracks[0].blocks().next().expect("one block");
    let curve = arena.curve(block, CurveChannel::Primary);
    assert_eq!(curve.len(), 1);
    let kf = curve.get(0).expect("keyframe at 0");
    assert_eq!(kf.value, 0x40 as f64);
    assert_eq!(kf.curve_type, CurveType::Step);
}

#[test]
fn test_note_on_ignored_cc_on_other_channel_recorded() {
    // [0x90,0x40,0x7F] is a note-on (ignored); the CC on channel 1 must
    // come through as exactly one token.
    let (mut tx, rx) = create_chunk_channel(16);
    let mut recorder = Recorder::new(rx);
    let mut arena = BlockArena::new();
    let mut tracks = vec![armed_track(0, 1)];
    tracks[0].midi_channel = 1;

    recorder.begin_pass(&mut tracks);
    push_raw(&mut tx, 0, 0, &[0x90, 0x40, 0x7F, 0xB1, 0x01, 0x10]);
    recorder.commit(&mut arena, &mut tracks);

    assert_eq!(tracks[0].block_count(), 1);
    let (_, block) = tracks[0].blocks().next().expect("one block");
    assert_eq!(arena.curve(block, CurveChannel::Primary).len(), 1);
}

#[test]
fn test_gap_segmentation_produces_two_blocks() {
    let (mut tx, rx) = create_chunk_channel(16);
    let mut recorder = Recorder::new(rx);
    let mut arena = BlockArena::new();
    let mut tracks = vec![armed_track(0, 7)];

    recorder.begin_pass(&mut tracks);
    for time in [0, 500, 1000, 4000, 4200] {
        push_raw(&mut tx, 0, time, &[0xB0, 0x07, 0x40]);
    }
    recorder.commit(&mut arena, &mut tracks);

    let blocks: Vec<_> = tracks[0].blocks().collect();
    assert_eq!(blocks.len(), 2);

    let (first_start, first) = blocks[0];
    assert_eq!(first_start, 0);
    let first_ticks: Vec<i64> = arena
        .curve(first, CurveChannel::Primary)
        .keyframes()
        .map(|kf| kf.tick)
        .collect();
    assert_eq!(first_ticks, vec![0, 500, 1000]);

    let (second_start, second) = blocks[1];
    assert_eq!(second_start, 4000);
    let second_ticks: Vec<i64> = arena
        .curve(second, CurveChannel::Primary)
        .keyframes()
        .map(|kf| kf.tick)
        .collect();
    assert_eq!(second_ticks, vec![0, 200]);
}

#[test]
fn test_recording_over_existing_blocks_leaves_no_overlaps() {
    let (mut tx, rx) = create_chunk_channel(64);
    let mut recorder = Recorder::new(rx);
    let mut arena = BlockArena::new();
    let mut tracks = vec![armed_track(0, 7)];

    // Two existing blocks.
    for start in [0i64, 3000] {
        let mut block = TimedBlock::new(start, "existing");
        for tick in [0i64, 400] {
            block.curve_mut(CurveChannel::Primary).add_key(
                midicurve::Keyframe::with_curve(tick, 1.0, CurveType::Step),
            );
        }
        let id = arena.insert(block);
        tracks[0].add_block(&arena, id);
    }

    // Record a run crossing the first block and another inside the second.
    recorder.begin_pass(&mut tracks);
    for time in [200, 600, 3100] {
        push_raw(&mut tx, 0, time, &[0xB0, 0x07, 0x30]);
    }
    recorder.commit(&mut arena, &mut tracks);

    assert!(!tracks[0].has_overlaps(&arena));
    // Sampling still answers everywhere.
    for tick in [0, 200, 500, 2000, 3100, 5000] {
        let _ = tracks[0].sample_as_byte(&arena, tick);
    }
}

#[test]
fn test_unarmed_track_records_nothing() {
    let (mut tx, rx) = create_chunk_channel(16);
    let mut recorder = Recorder::new(rx);
    let mut arena = BlockArena::new();
    let mut tracks = vec![armed_track(0, 7)];
    tracks[0].record_armed = false;

    recorder.begin_pass(&mut tracks);
    push_raw(&mut tx, 0, 0, &[0xB0, 0x07, 0x40]);
    recorder.commit(&mut arena, &mut tracks);

    assert!(tracks[0].is_empty());
    assert!(arena.is_empty());
}

#[test]
fn test_merge_policy_join_extends_track_forward() {
    // Join keeps old keys strictly before the new block and appends the
    // incoming data, seamlessly extending the timeline.
    let mut arena = BlockArena::new();
    let mut track = Track::new("cc7");

    let mut old = TimedBlock::new(0, "take 1");
    for (tick, value) in [(0i64, 10.0), (500, 20.0), (1000, 30.0)] {
        old.curve_mut(CurveChannel::Primary)
            .add_key(midicurve::Keyframe::with_curve(tick, value, CurveType::Step));
    }
    let old_id = arena.insert(old);
    track.add_block(&arena, old_id);

    let mut new = TimedBlock::new(500, "take 2");
    for (tick, value) in [(0i64, 99.0), (300, 98.0)] {
        new.curve_mut(CurveChannel::Primary)
            .add_key(midicurve::Keyframe::with_curve(tick, value, CurveType::Step));
    }
    let new_id = arena.insert(new);

    track.merge_block_lists(&mut arena, vec![new_id], MergePolicy::Join);

    assert_eq!(track.block_count(), 1);
    let (_, merged) = track.blocks().next().expect("merged block");
    let values: Vec<(i64, f64)> = arena
        .curve(merged, CurveChannel::Primary)
        .keyframes()
        .map(|kf| (kf.tick, kf.value))
        .collect();
    assert_eq!(values, vec![(0, 10.0), (500, 99.0), (800, 98.0)]);
}
