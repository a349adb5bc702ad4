//! Part lifecycle tests through the services with a live deferred queue.
//!
//! Covers the reconciliation contract:
//! - appending never queues a correction pass
//! - an arbitrary create position converges to a unique, contiguous list
//! - deleting renumbers the tail
//! - episodes are isolated from each other's reorders

use std::time::Duration;

use partwise::reorder::ReorderQueue;
use partwise::service::{EpisodeService, NewPart, PartService, PartUpdate};
use partwise::store::{Engine, EpisodeId, PartId};

fn setup() -> (Engine, PartService, EpisodeService, ReorderQueue) {
    let engine = Engine::new();
    let queue = ReorderQueue::start(engine.clone());
    let parts = PartService::new(engine.clone(), queue.clone());
    let episodes = EpisodeService::new(engine.clone());
    (engine, parts, episodes, queue)
}

fn positions(engine: &Engine, episode_id: EpisodeId) -> Vec<i64> {
    engine
        .parts_of_episode(episode_id)
        .iter()
        .map(|p| p.position)
        .collect()
}

async fn wait_for_positions(engine: &Engine, episode_id: EpisodeId, expected: &[i64]) {
    for _ in 0..200 {
        if positions(engine, episode_id) == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "positions never became {:?}, last seen {:?}",
        expected,
        positions(engine, episode_id)
    );
}

fn append(parts: &PartService, episode_id: EpisodeId, title: &str) -> PartId {
    parts
        .create_part(NewPart {
            episode_id,
            title: title.into(),
            position: None,
        })
        .unwrap()
        .id
}

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn test_appending_assigns_sequential_positions_without_reorder() {
    let (engine, parts, episodes, queue) = setup();
    let episode = episodes.create_episode("pilot").unwrap();

    for i in 1..=5 {
        let part = parts
            .create_part(NewPart {
                episode_id: episode.id,
                title: format!("part {}", i),
                position: None,
            })
            .unwrap();
        assert_eq!(part.position, i);
    }

    assert!(!queue.in_flight(episode.id));
    assert_eq!(positions(&engine, episode.id), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_colliding_create_converges_to_contiguous_unique_positions() {
    let (engine, parts, episodes, _queue) = setup();
    let episode = episodes.create_episode("pilot").unwrap();
    for i in 1..=3 {
        append(&parts, episode.id, &format!("part {}", i));
    }

    let wedged = parts
        .create_part(NewPart {
            episode_id: episode.id,
            title: "wedged".into(),
            position: Some(2),
        })
        .unwrap();
    assert_eq!(wedged.position, 2);

    wait_for_positions(&engine, episode.id, &[1, 2, 3, 4]).await;
    assert_eq!(engine.get_part(wedged.id).unwrap().position, 2);
}

// =============================================================================
// Delete
// =============================================================================

#[tokio::test]
async fn test_delete_renumbers_parts_above_vacated_position() {
    let (engine, parts, episodes, _queue) = setup();
    let episode = episodes.create_episode("pilot").unwrap();
    let mut ids = Vec::new();
    for i in 1..=5 {
        ids.push(append(&parts, episode.id, &format!("part {}", i)));
    }

    // Delete position 3 of 5; former 4 and 5 become 3 and 4.
    parts.delete_part(ids[2]).unwrap();
    wait_for_positions(&engine, episode.id, &[1, 2, 3, 4]).await;
    assert_eq!(engine.get_part(ids[3]).unwrap().position, 3);
    assert_eq!(engine.get_part(ids[4]).unwrap().position, 4);
}

#[tokio::test]
async fn test_deleted_part_stays_deleted_after_reconciliation() {
    let (engine, parts, episodes, queue) = setup();
    let episode = episodes.create_episode("pilot").unwrap();
    let only = append(&parts, episode.id, "solo");

    parts.delete_part(only).unwrap();
    for _ in 0..200 {
        if !queue.in_flight(episode.id) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(engine.get_part(only).is_none());
    assert!(positions(&engine, episode.id).is_empty());
}

// =============================================================================
// Updates and isolation
// =============================================================================

#[tokio::test]
async fn test_positions_remain_distinct_after_synchronous_updates() {
    let (engine, parts, episodes, _queue) = setup();
    let episode = episodes.create_episode("pilot").unwrap();
    let mut ids = Vec::new();
    for i in 1..=8 {
        ids.push(append(&parts, episode.id, &format!("part {}", i)));
    }

    parts.sort_part(ids[7], 1).unwrap();
    parts.sort_part(ids[0], 5).unwrap();
    parts
        .update_part(
            ids[3],
            PartUpdate {
                title: Some("renamed".into()),
                position: Some(8),
            },
        )
        .unwrap();

    let mut seen = positions(&engine, episode.id);
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 8);
}

#[tokio::test]
async fn test_reorder_in_one_episode_leaves_others_untouched() {
    let (engine, parts, episodes, _queue) = setup();
    let left = episodes.create_episode("left").unwrap();
    let right = episodes.create_episode("right").unwrap();
    let mut left_ids = Vec::new();
    for i in 1..=4 {
        left_ids.push(append(&parts, left.id, &format!("l{}", i)));
        append(&parts, right.id, &format!("r{}", i));
    }
    let before = positions(&engine, right.id);

    parts.sort_part(left_ids[3], 1).unwrap();

    assert_eq!(positions(&engine, right.id), before);
    assert_eq!(positions(&engine, left.id), vec![1, 2, 3, 4]);
}
