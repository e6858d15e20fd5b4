//! Debounced scroll listener.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use common::ScriptedSource;
use livescroll_lib::GridConfig;
use livescroll_lib::LiveGrid;
use tokio::time::sleep;

fn window(v: &[usize]) -> BTreeSet<usize> {
    v.iter().copied().collect()
}

async fn ready_grid(source: &Arc<ScriptedSource>) -> LiveGrid {
    let config = GridConfig::new()
        .with_page_size(10)
        .with_scroll_debounce(Duration::from_millis(500));
    let grid = LiveGrid::new(source.clone(), config).unwrap();
    grid.refresh().await.unwrap();
    grid
}

#[tokio::test(start_paused = true)]
async fn test_burst_settles_on_last_position() {
    let source = ScriptedSource::new(1_000);
    let grid = ready_grid(&source).await;
    let feed = grid.listen_scroll();

    assert!(feed.push(&["1"]));
    sleep(Duration::from_millis(100)).await;
    assert!(feed.push(&["1", "2"]));
    sleep(Duration::from_millis(100)).await;
    assert!(feed.push(&["2", "3"]));
    sleep(Duration::from_millis(400)).await;

    // quiet period not over yet
    assert_eq!(grid.resident_window(), window(&[0]));

    sleep(Duration::from_millis(200)).await;
    assert_eq!(grid.resident_window(), window(&[2, 3]));
    assert_eq!(source.request_count(1), 0);
    assert_eq!(source.request_count(2), 1);
    assert_eq!(source.request_count(3), 1);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_and_invalid_positions_ignored() {
    let source = ScriptedSource::new(1_000);
    let grid = ready_grid(&source).await;
    let feed = grid.listen_scroll();

    feed.push(&["4"]);
    sleep(Duration::from_millis(600)).await;
    assert_eq!(grid.resident_window(), window(&[4]));
    let before = source.requests().len();

    // same window again, then garbage
    feed.push(&[" 4 "]);
    sleep(Duration::from_millis(600)).await;
    feed.push(&["x", "NaN", "-1"]);
    sleep(Duration::from_millis(600)).await;

    assert_eq!(grid.resident_window(), window(&[4]));
    assert_eq!(source.requests().len(), before);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_feed_applies_pending_position() {
    let source = ScriptedSource::new(1_000);
    let grid = ready_grid(&source).await;
    let feed = grid.listen_scroll();

    feed.push(&["7"]);
    drop(feed);
    sleep(Duration::from_millis(10)).await;

    assert_eq!(grid.resident_window(), window(&[7]));
}

#[tokio::test(start_paused = true)]
async fn test_teardown_stops_listener() {
    let source = ScriptedSource::new(1_000);
    let grid = ready_grid(&source).await;
    let feed = grid.listen_scroll();

    feed.push(&["5"]);
    grid.teardown();
    sleep(Duration::from_millis(600)).await;

    assert_eq!(grid.resident_window(), window(&[0]));
    assert!(!feed.push(&["6"]));
}

#[tokio::test(start_paused = true)]
async fn test_refresh_forgets_settled_position() {
    let source = ScriptedSource::new(1_000);
    let grid = ready_grid(&source).await;
    let feed = grid.listen_scroll();

    feed.push(&["3"]);
    sleep(Duration::from_millis(600)).await;
    assert_eq!(grid.resident_window(), window(&[3]));

    grid.refresh().await.unwrap();
    assert_eq!(grid.resident_window(), window(&[0]));

    feed.push(&["3"]);
    sleep(Duration::from_millis(600)).await;
    assert_eq!(grid.resident_window(), window(&[3]));
    assert_eq!(source.request_count(3), 2);
}
