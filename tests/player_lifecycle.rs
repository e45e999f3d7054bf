mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{ScriptedBaker, config, player, scene};
use lyric_dance::{
    AudioResource, BakeRegistry, Layer, LogicalSize, LyricDancePlayer, PlayerState, WallClockAudio,
};

fn ready(lines: usize, direction: bool) -> (LyricDancePlayer, lyric_dance::SteppedAudio, Arc<ScriptedBaker>) {
    let baker = Arc::new(ScriptedBaker::new());
    let (mut p, audio) = player(
        scene("life", lines, direction),
        baker.clone(),
        Arc::new(BakeRegistry::new()),
    );
    p.init().unwrap();
    (p, audio, baker)
}

#[test]
fn undirected_scene_uses_default_chapter_and_fires_no_events() {
    let (mut p, _audio, _) = ready(3, false);
    let composer = p.composer().unwrap();
    assert!(composer.chapters().is_synthetic());
    assert_eq!(composer.chapters().len(), 1);
    assert!(composer.chapters().get(0).unwrap().tint.luminance() < 0.1);
    assert!(composer.events().events().is_empty());

    for i in 0..=45 {
        p.seek(f64::from(i) * 0.1);
        assert!(p.tick(f64::from(i) * 100.0));
        let m = p.metrics();
        assert!(!m.drew(Layer::Covers));
        assert_eq!(m.chapter, 0);
        assert_eq!(m.active_events, 0);
        assert_eq!(m.events_fired, 0);
    }
    assert_eq!(p.draw_errors(), 0);
}

#[test]
fn layers_follow_the_fixed_draw_order() {
    let (mut p, _audio, _) = ready(2, true);
    p.seek(0.1);
    p.tick(16.0);
    let m = p.metrics().clone();
    assert_eq!(&m.layers[..2], &[Layer::Clear, Layer::Background]);
    assert!(m.layers.windows(2).all(|w| w[0] < w[1]), "{:?}", m.layers);
    for layer in [Layer::Words, Layer::Particles, Layer::Emitters, Layer::Watermark] {
        assert!(m.drew(layer), "missing {layer:?}");
    }
    assert_eq!(m.keyframe_index, Some(1));
    assert_eq!(m.frame, 1);
}

#[test]
fn seek_to_rearms_word_emitters() {
    let (mut p, _audio, _) = ready(2, false);

    p.seek(0.1);
    p.tick(0.0);
    assert_eq!(p.metrics().words.spawned, 1);

    p.seek(2.0);
    p.tick(100.0);
    p.seek(0.1);
    p.tick(200.0);
    assert_eq!(p.metrics().words.spawned, 0, "a plain seek keeps bookkeeping");

    p.seek_to(0.1);
    p.tick(300.0);
    assert_eq!(p.metrics().words.spawned, 1);
}

#[test]
fn loop_wrap_rearms_word_emitters() {
    let (mut p, audio, _) = ready(2, false);
    assert!(audio.looping());

    let mut first_pass = 0;
    let mut second_pass = 0;
    let mut wrapped = false;
    let mut last = p.current_time();
    for i in 0..60 {
        p.tick(f64::from(i) * 100.0);
        if p.current_time() < last {
            wrapped = true;
        }
        last = p.current_time();
        let spawned = p.metrics().words.spawned;
        if wrapped {
            second_pass += spawned;
        } else {
            first_pass += spawned;
        }
        audio.advance(0.1);
    }
    assert!(wrapped);
    assert_eq!(first_pass, 6);
    assert_eq!(second_pass, 6);
}

#[test]
fn out_of_order_words_still_bake_every_chunk() {
    let mut s = scene("shuffled", 2, false);
    s.words.reverse();
    let (mut p, _audio) = player(s, Arc::new(ScriptedBaker::new()), Arc::new(BakeRegistry::new()));
    p.init().unwrap();
    assert_eq!(p.chunks().len(), 6);
    assert_eq!(p.shared_bake().unwrap().unresolved_keys, 0);

    p.seek(1.6);
    p.tick(0.0);
    assert_eq!(p.metrics().words.missing, 0);
    assert_eq!(p.metrics().words.drawn, 1);
}

#[test]
fn comment_starts_at_the_given_host_time() {
    let (mut p, _audio, _) = ready(1, false);
    p.tick(0.0);
    p.fire_comment("late", 10_000.0);
    let comet = p.comets().comets().next().unwrap();
    assert_eq!(comet.started_ms, 10_000.0);
    assert_eq!(comet.progress(10_000.0), 0.0);
    p.tick(10_016.0);
    assert_eq!(p.metrics().comets, 1);
}

#[test]
fn resize_rescales_without_rebaking() {
    let (mut p, _audio, baker) = ready(1, false);
    let x_before = p.timeline().unwrap().frames()[1].chunks[0].x;

    p.resize(LogicalSize::new(180.0, 320.0), 2.0).unwrap();
    assert_eq!(baker.calls(), 1);
    assert_eq!(p.timeline().unwrap().applied_scale(), (2.0, 2.0));
    assert_eq!(p.timeline().unwrap().size_scale(), 2.0);
    let canvas = p.surfaces().canvas();
    assert_eq!((canvas.width, canvas.height), (360, 640));
    let x_after = p.timeline().unwrap().frames()[1].chunks[0].x;
    assert!((x_after - 2.0 * x_before).abs() < 1e-9);

    p.resize(LogicalSize::new(90.0, 160.0), 1.0).unwrap();
    let x_back = p.timeline().unwrap().frames()[1].chunks[0].x;
    assert!((x_back - x_before).abs() < 1e-9);
    assert_eq!(p.composer().unwrap().chapters().tile_size(), (90, 160));
    assert_eq!(baker.calls(), 1);
}

#[test]
fn seek_clamps_to_song_window() {
    let (mut p, audio, _) = ready(2, false);
    p.seek(-5.0);
    assert_eq!(p.current_time(), 0.0);
    p.seek(1e9);
    assert_eq!(p.current_time(), p.scene().song_end);
    assert_eq!(audio.current_time(), p.scene().song_end);
    p.seek(f64::NAN);
    assert_eq!(p.current_time(), 0.0);
}

#[test]
fn destroy_is_idempotent_and_releases_audio() {
    let (mut p, audio, _) = ready(1, false);
    p.destroy();
    p.destroy();
    assert_eq!(p.state(), PlayerState::Destroyed);
    assert!(audio.is_released());
    assert!(!p.tick(0.0));
    assert!(p.init().is_err());
    assert!(p.resize(LogicalSize::new(10.0, 10.0), 1.0).is_err());
}

#[test]
fn unmute_resumes_blocked_autoplay() {
    let s = scene("autoplay", 1, false);
    let audio = WallClockAudio::new(s.song_end).unwrap().with_autoplay_block();
    let mut p = LyricDancePlayer::new(
        s,
        Arc::new(ScriptedBaker::new()),
        Arc::new(BakeRegistry::new()),
        Box::new(audio),
        config(),
    )
    .unwrap();
    p.init().unwrap();
    assert!(!p.is_playing());
    assert!(!p.play().unwrap());

    p.set_muted(false);
    assert!(p.is_playing());
}

#[test]
fn comments_are_bounded_to_the_latest_eight() {
    let (mut p, _audio, _) = ready(1, false);
    p.tick(0.0);
    for i in 0..20 {
        p.fire_comment(&format!("comment {i}"), 0.0);
    }
    assert_eq!(p.comets().len(), 8);
    let first = p.comets().comets().next().unwrap();
    assert_eq!(first.text, "comment 12");
    p.tick(10.0);
    assert_eq!(p.metrics().comets, 8);
    assert!(p.metrics().drew(Layer::Comets));
}

#[test]
fn direction_update_rebuilds_systems_without_restarting_audio() {
    let registry = Arc::new(BakeRegistry::new());
    let baker = Arc::new(ScriptedBaker::new());
    let (mut p, audio) = player(scene("late", 2, false), baker.clone(), registry.clone());
    p.init().unwrap();
    let plays = audio.play_count();
    assert!(p.composer().unwrap().chapters().is_synthetic());

    let direction = scene("late", 2, true).cinematic_direction;
    p.update_cinematic_direction(direction).unwrap();

    let composer = p.composer().unwrap();
    assert_eq!(composer.chapters().len(), 2);
    assert!(!composer.events().events().is_empty());
    assert_eq!(audio.play_count(), plays);
    assert_eq!(baker.calls(), 1);
    assert!(registry.current().is_none(), "undirected bake invalidated");
    assert_eq!(p.chunks().len(), 6);

    p.seek(0.1);
    assert!(p.tick(0.0));
    assert_eq!(p.draw_errors(), 0);
}

#[test]
fn health_reporter_runs_until_destroy() {
    let s = scene("health", 1, false);
    let audio = lyric_dance::SteppedAudio::new(s.song_end).unwrap();
    let mut cfg = config();
    cfg.health_interval_secs = 0.01;
    let mut p = LyricDancePlayer::new(
        s,
        Arc::new(ScriptedBaker::new()),
        Arc::new(BakeRegistry::new()),
        Box::new(audio),
        cfg,
    )
    .unwrap();
    p.init().unwrap();
    assert!(p.health_running());
    p.tick(0.0);
    let handle = p.metrics_handle();
    let deadline = Instant::now() + Duration::from_secs(5);
    while handle.lock().unwrap().frame == 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(handle.lock().unwrap().frame, 1);
    p.destroy();
    assert!(!p.health_running());
}
