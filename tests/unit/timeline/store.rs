use super::*;
use crate::chunks::key::ChunkKey;
use crate::timeline::keyframe::{BakedChunk, BakedParticle, EmitterKind};

fn chunk(x: f64, y: f64) -> BakedChunk {
    BakedChunk {
        key: ChunkKey::new(0, 0, 0),
        x,
        y,
        scale_x: 1.0,
        scale_y: 1.0,
        skew_x: 0.0,
        alpha: 1.0,
        glow: 0.0,
        font_size: 40.0,
        font_weight: 400,
        visible: true,
        is_anchor: false,
        color: None,
        icon: None,
        emitter: EmitterKind::None,
    }
}

fn kf(time_ms: f64) -> BakedKeyframe {
    BakedKeyframe {
        time_ms,
        beat_index: None,
        camera_x: time_ms * 0.01,
        camera_y: -3.0,
        camera_zoom: 1.0,
        bg_blend: 0.0,
        particles: vec![BakedParticle {
            x: 5.0,
            y: 7.0,
            size: 2.0,
            alpha: 1.0,
            color: None,
        }],
        chunks: vec![chunk(100.0 + time_ms * 0.1, 200.0)],
    }
}

fn timeline(times: &[f64]) -> Timeline {
    Timeline::new(
        times.iter().map(|t| kf(*t)).collect(),
        LogicalSize::new(960.0, 540.0),
    )
    .unwrap()
}

#[test]
fn query_before_first_returns_first() {
    let t = timeline(&[100.0, 200.0, 300.0]);
    assert_eq!(t.get_frame(-50.0).unwrap().time_ms, 100.0);
    assert_eq!(t.get_frame(0.0).unwrap().time_ms, 100.0);
}

#[test]
fn query_between_keyframes_returns_preceding() {
    let t = timeline(&[0.0, 100.0, 200.0, 300.0]);
    assert_eq!(t.get_frame(100.0).unwrap().time_ms, 100.0);
    assert_eq!(t.get_frame(199.999).unwrap().time_ms, 100.0);
    assert_eq!(t.get_frame(200.0).unwrap().time_ms, 200.0);
    assert_eq!(t.get_frame(10_000.0).unwrap().time_ms, 300.0);
}

#[test]
fn every_keyframe_owns_its_half_open_interval() {
    let times: Vec<f64> = (0..97).map(|i| f64::from(i) * 33.3).collect();
    let t = timeline(&times);
    for (i, w) in times.windows(2).enumerate() {
        let mid = (w[0] + w[1]) * 0.5;
        assert_eq!(t.index_at(w[0]), Some(i));
        assert_eq!(t.index_at(mid), Some(i));
    }
}

#[test]
fn duplicate_times_resolve_to_last_duplicate() {
    let t = timeline(&[0.0, 100.0, 100.0, 200.0]);
    assert_eq!(t.index_at(150.0), Some(2));
}

#[test]
fn empty_timeline_has_no_frame() {
    let t = timeline(&[]);
    assert!(t.get_frame(0.0).is_none());
}

#[test]
fn rejects_decreasing_times() {
    let frames = vec![kf(100.0), kf(50.0)];
    assert!(Timeline::new(frames, LogicalSize::new(10.0, 10.0)).is_err());
}

#[test]
fn unscale_then_scale_at_same_ratio_is_lossless() {
    let original = timeline(&[0.0, 40.0, 80.0]);
    let mut frames = original.frames().to_vec();
    let (sx, sy) = (1.37, 0.61);
    scale_timeline(&mut frames, sx, sy);
    let scaled = frames.clone();

    unscale_timeline(&mut frames, sx, sy);
    scale_timeline(&mut frames, sx, sy);

    for (a, b) in frames.iter().zip(scaled.iter()) {
        assert!((a.camera_x - b.camera_x).abs() < 1e-9);
        assert!((a.camera_y - b.camera_y).abs() < 1e-9);
        assert!((a.chunks[0].x - b.chunks[0].x).abs() < 1e-9);
        assert!((a.chunks[0].y - b.chunks[0].y).abs() < 1e-9);
        assert!((a.particles[0].x - b.particles[0].x).abs() < 1e-9);
    }
}

#[test]
fn rescale_round_trip_through_other_sizes_restores_positions() {
    let original = timeline(&[0.0, 500.0]);
    let mut t = original.clone();
    t.rescale_to(LogicalSize::new(1920.0, 1080.0)).unwrap();
    assert_eq!(t.applied_scale(), (2.0, 2.0));
    assert!((t.frames()[1].chunks[0].x - original.frames()[1].chunks[0].x * 2.0).abs() < 1e-9);

    t.rescale_to(LogicalSize::new(333.0, 777.0)).unwrap();
    t.rescale_to(LogicalSize::new(960.0, 540.0)).unwrap();
    for (a, b) in t.frames().iter().zip(original.frames()) {
        assert!((a.camera_x - b.camera_x).abs() < 1e-9);
        assert!((a.chunks[0].x - b.chunks[0].x).abs() < 1e-9);
        assert!((a.chunks[0].y - b.chunks[0].y).abs() < 1e-9);
    }
    // Non-positional fields are untouched.
    assert_eq!(t.frames()[0].chunks[0].font_size, 40.0);
    assert_eq!(t.frames()[0].camera_zoom, 1.0);
}
