//! Contention behavior: fail-fast under held locks, timeout restoration,
//! and consistency after concurrent overlapping updates.

use std::time::Duration;

use partwise::reorder::ReorderQueue;
use partwise::service::{EpisodeService, NewPart, PartService};
use partwise::store::{Engine, EpisodeId, PartId, RowKey, StoreError};

fn seeded(
    count: i64,
    tight_window: Duration,
) -> (Engine, PartService, EpisodeId, Vec<PartId>) {
    let engine = Engine::new();
    let queue = ReorderQueue::start(engine.clone());
    let parts = PartService::with_tight_window(engine.clone(), queue, tight_window);
    let episode = EpisodeService::new(engine.clone())
        .create_episode("pilot")
        .unwrap();
    let mut ids = Vec::new();
    for i in 1..=count {
        ids.push(
            parts
                .create_part(NewPart {
                    episode_id: episode.id,
                    title: format!("part {}", i),
                    position: None,
                })
                .unwrap()
                .id,
        );
    }
    (engine, parts, episode.id, ids)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sort_fails_fast_when_row_is_held() {
    let (engine, parts, _episode_id, ids) = seeded(3, Duration::from_millis(100));
    let held = ids[1];

    // Another session holds the row for much longer than the tight window.
    let blocker = std::thread::spawn({
        let engine = engine.clone();
        move || {
            engine
                .transaction(|txn| {
                    txn.lock(RowKey::Part(held))?;
                    std::thread::sleep(Duration::from_millis(600));
                    Ok(())
                })
                .unwrap();
        }
    });
    std::thread::sleep(Duration::from_millis(50));

    let started = std::time::Instant::now();
    let result = tokio::task::spawn_blocking(move || parts.sort_part(held, 1))
        .await
        .unwrap();

    assert!(matches!(result, Err(StoreError::LockContention(_))));
    // Bounded by the tight window, not the engine default.
    assert!(started.elapsed() < Duration::from_secs(5));

    blocker.join().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_lock_timeout_restored_after_contended_update() {
    let (engine, parts, _episode_id, ids) = seeded(2, Duration::from_millis(100));
    let held = ids[0];
    let default_timeout = engine.lock_wait_timeout();

    let blocker = std::thread::spawn({
        let engine = engine.clone();
        move || {
            engine
                .transaction(|txn| {
                    txn.lock(RowKey::Part(held))?;
                    std::thread::sleep(Duration::from_millis(400));
                    Ok(())
                })
                .unwrap();
        }
    });
    std::thread::sleep(Duration::from_millis(50));

    let result = tokio::task::spawn_blocking(move || parts.sort_part(held, 2))
        .await
        .unwrap();
    assert!(result.is_err());

    blocker.join().unwrap();
    assert_eq!(engine.lock_wait_timeout(), default_timeout);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_overlapping_sorts_keep_positions_unique() {
    // Generous tight window so both updates serialize rather than time out;
    // either outcome is allowed, corruption is not.
    let (engine, parts, episode_id, ids) = seeded(20, Duration::from_secs(5));
    let default_timeout = engine.lock_wait_timeout();

    let first = {
        let parts = parts.clone();
        let id = ids[14];
        tokio::task::spawn_blocking(move || parts.sort_part(id, 3))
    };
    let second = {
        let parts = parts.clone();
        let id = ids[4];
        tokio::task::spawn_blocking(move || parts.sort_part(id, 12))
    };
    let (first, second) = (first.await.unwrap(), second.await.unwrap());

    for result in [first, second] {
        match result {
            Ok(_) => {}
            Err(err) => assert!(err.is_retryable(), "unexpected failure: {}", err),
        }
    }

    let mut positions: Vec<i64> = engine
        .parts_of_episode(episode_id)
        .iter()
        .map(|p| p.position)
        .collect();
    assert_eq!(positions.len(), 20);
    positions.sort();
    positions.dedup();
    assert_eq!(positions.len(), 20, "positions collided");

    // The tight windows of the two updates overlapped; neither may have
    // dragged the engine default down with it.
    assert_eq!(engine.lock_wait_timeout(), default_timeout);
    assert_eq!(engine.effective_lock_wait_timeout(), default_timeout);
}
