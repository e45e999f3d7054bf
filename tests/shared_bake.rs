mod common;

use std::sync::{Arc, Barrier};

use common::{ScriptedBaker, player, scene};
use lyric_dance::{BakeRegistry, PlayerState};

#[test]
fn concurrent_players_share_one_bake() {
    let baker = Arc::new(ScriptedBaker::slow(60));
    let registry = Arc::new(BakeRegistry::new());
    let barrier = Barrier::new(4);

    let seen: Vec<(usize, usize)> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let (baker, registry, barrier) = (baker.clone(), registry.clone(), &barrier);
                s.spawn(move || {
                    let (mut p, _audio) = player(scene("shared", 3, false), baker, registry);
                    barrier.wait();
                    p.init().unwrap();
                    let out = (p.timeline().unwrap().len(), p.chunks().len());
                    p.destroy();
                    out
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(baker.calls(), 1);
    assert_eq!(registry.bakes_started(), 1);
    assert!(seen.iter().all(|s| *s == seen[0]));
    assert_eq!(seen[0].1, 9);
}

#[test]
fn changed_session_key_rebakes_and_same_key_reuses() {
    let baker = Arc::new(ScriptedBaker::new());
    let registry = Arc::new(BakeRegistry::new());

    let (mut a, _) = player(scene("song", 2, false), baker.clone(), registry.clone());
    a.init().unwrap();
    assert_eq!(baker.calls(), 1);

    // Same id, different word count.
    let (mut b, _) = player(scene("song", 3, false), baker.clone(), registry.clone());
    b.init().unwrap();
    assert_eq!(baker.calls(), 2);

    let (mut c, _) = player(scene("song", 3, false), baker.clone(), registry.clone());
    c.init().unwrap();
    assert_eq!(baker.calls(), 2);
    assert!(Arc::ptr_eq(
        b.shared_bake().unwrap(),
        c.shared_bake().unwrap()
    ));

    let (mut d, _) = player(scene("other", 3, false), baker.clone(), registry);
    d.init().unwrap();
    assert_eq!(baker.calls(), 3);
}

#[test]
fn direction_arriving_later_forces_rebake() {
    let baker = Arc::new(ScriptedBaker::new());
    let registry = Arc::new(BakeRegistry::new());

    let (mut a, _) = player(scene("dir", 2, false), baker.clone(), registry.clone());
    a.init().unwrap();
    let (mut b, _) = player(scene("dir", 2, true), baker.clone(), registry.clone());
    b.init().unwrap();
    assert_eq!(baker.calls(), 2);

    // A directed bake also serves players without direction.
    let (mut c, _) = player(scene("dir", 2, false), baker.clone(), registry);
    c.init().unwrap();
    assert_eq!(baker.calls(), 2);
}

#[test]
fn bake_failure_propagates_and_next_init_retries() {
    let registry = Arc::new(BakeRegistry::new());
    let (mut a, _) = player(
        scene("flaky", 2, false),
        Arc::new(ScriptedBaker::failing()),
        registry.clone(),
    );
    let err = a.init().unwrap_err();
    assert!(err.to_string().contains("baker offline"), "{err}");
    assert_eq!(a.state(), PlayerState::Created);
    assert!(a.timeline().is_none());
    assert!(!a.tick(0.0));

    let good = Arc::new(ScriptedBaker::new());
    let (mut b, _) = player(scene("flaky", 2, false), good.clone(), registry);
    b.init().unwrap();
    assert_eq!(good.calls(), 1);
    assert_eq!(b.state(), PlayerState::Ready);
}

#[test]
fn destroy_leaves_shared_bake_for_the_next_player() {
    let baker = Arc::new(ScriptedBaker::new());
    let registry = Arc::new(BakeRegistry::new());

    let (mut a, _) = player(scene("keep", 2, false), baker.clone(), registry.clone());
    a.init().unwrap();
    a.destroy();
    assert!(registry.current().is_some());

    let (mut b, _) = player(scene("keep", 2, false), baker.clone(), registry);
    b.init().unwrap();
    assert_eq!(baker.calls(), 1);
}

#[test]
fn keys_missing_from_cache_are_counted_not_fatal() {
    let baker = Arc::new(ScriptedBaker {
        orphan: true,
        ..ScriptedBaker::new()
    });
    let (mut p, _) = player(scene("orphan", 1, false), baker, Arc::new(BakeRegistry::new()));
    p.init().unwrap();
    assert_eq!(p.shared_bake().unwrap().unresolved_keys, 1);

    p.seek(0.1);
    assert!(p.tick(0.0));
    let m = p.metrics();
    assert_eq!(p.draw_errors(), 0);
    assert_eq!(m.words.visible, 2);
    assert_eq!(m.words.drawn, 1);
    assert_eq!(m.words.missing, 1);
    assert_eq!(m.missing_total, 1);
}
