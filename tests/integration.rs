//! Integration tests for archive replay.

use chrono::NaiveDate;
use slot_replay::{Category, DirArchive, Envelope, ReplayConfig, ReplaySession, Slot};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn pair(slot: u64) -> String {
    format!(r#"{{"slot":{},"signature":"p{}","pair":{{"ammAccount":"amm"}}}}"#, slot, slot)
}

fn swap(slot: u64) -> String {
    format!(r#"{{"slot":{},"signature":"s{}","swap":{{"walletAccount":"w"}}}}"#, slot, slot)
}

fn write_log(root: &Path, segment: &str, category: Category, lines: &[String]) {
    let dir = root.join(segment);
    fs::create_dir_all(&dir).unwrap();
    let mut body = String::new();
    for line in lines {
        body.push_str(line);
        body.push('\n');
    }
    fs::write(dir.join(category.file_name()), body).unwrap();
}

fn slot_of(envelope: &Envelope) -> u64 {
    let value: serde_json::Value = serde_json::from_str(envelope.params.get()).unwrap();
    value["slot"].as_u64().unwrap()
}

fn session(root: &Path, config: ReplayConfig) -> ReplaySession<DirArchive> {
    let mut session = ReplaySession::new(Arc::new(DirArchive::new(root)), config).unwrap();
    session.subscribe(Category::NewPair);
    session.subscribe(Category::Swap);
    session
}

// --- Realistic Workflow Tests ---

#[test]
fn test_multi_segment_replay_continues_cursor() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    write_log(dir.path(), "20240501-130000", Category::NewPair, &[pair(1), pair(3)]);
    write_log(dir.path(), "20240501-130000", Category::Swap, &[swap(2)]);
    write_log(dir.path(), "20240501-140000", Category::NewPair, &[pair(3), pair(6)]);
    write_log(dir.path(), "20240501-140000", Category::Swap, &[swap(4)]);

    let mut envelopes = Vec::new();
    let summary = session(dir.path(), ReplayConfig::default())
        .run(&mut envelopes)
        .unwrap();

    let slots: Vec<u64> = envelopes.iter().map(slot_of).collect();
    assert_eq!(slots, vec![1, 2, 3, 3, 4, 6]);
    assert_eq!(summary.segments_replayed, 2);
    assert_eq!(summary.records_replayed, 6);
    assert_eq!(summary.envelopes_emitted, 6);
    assert_eq!(summary.first_slot, Some(Slot(1)));
    assert_eq!(summary.last_slot, Some(Slot(6)));
}

#[test]
fn test_envelopes_carry_method_and_subscription() {
    let dir = TempDir::new().unwrap();
    write_log(dir.path(), "seg", Category::NewPair, &[pair(10)]);
    write_log(dir.path(), "seg", Category::Swap, &[swap(10)]);

    let mut session = ReplaySession::new(
        Arc::new(DirArchive::new(dir.path())),
        ReplayConfig::default(),
    )
    .unwrap();
    let swaps = session.subscribe(Category::Swap);
    let pairs = session.subscribe(Category::NewPair);

    let mut envelopes = Vec::new();
    session.run(&mut envelopes).unwrap();

    assert_eq!(envelopes.len(), 2);
    assert_eq!(envelopes[0].method, "newPairNotification");
    assert_eq!(envelopes[0].subscription_id, pairs.0);
    assert_eq!(envelopes[0].params.get(), pair(10));
    assert_eq!(envelopes[1].method, "swapNotification");
    assert_eq!(envelopes[1].subscription_id, swaps.0);
}

#[test]
fn test_zero_subscriptions_drains_everything() {
    let dir = TempDir::new().unwrap();
    write_log(dir.path(), "seg", Category::NewPair, &[pair(1), pair(2)]);
    write_log(dir.path(), "seg", Category::Swap, &[swap(1), swap(3)]);

    let session =
        ReplaySession::new(Arc::new(DirArchive::new(dir.path())), ReplayConfig::default())
            .unwrap();
    let mut envelopes = Vec::new();
    let summary = session.run(&mut envelopes).unwrap();

    assert!(envelopes.is_empty());
    assert_eq!(summary.records_replayed, 4);
    assert_eq!(summary.last_slot, Some(Slot(3)));
}

#[test]
fn test_category_without_stream_never_emits() {
    let dir = TempDir::new().unwrap();
    write_log(dir.path(), "seg", Category::NewPair, &[pair(1), pair(2)]);

    let mut session =
        ReplaySession::new(Arc::new(DirArchive::new(dir.path())), ReplayConfig::default())
            .unwrap();
    session.subscribe(Category::Swap);

    let mut envelopes = Vec::new();
    let summary = session.run(&mut envelopes).unwrap();

    assert!(envelopes.is_empty());
    assert_eq!(summary.records_replayed, 2);
}

#[test]
fn test_from_date_skips_earlier_segments() {
    let dir = TempDir::new().unwrap();
    write_log(dir.path(), "20240501-230000", Category::Swap, &[swap(5)]);
    write_log(dir.path(), "20240502-000000", Category::Swap, &[swap(9)]);

    let config = ReplayConfig {
        from_date: NaiveDate::from_ymd_opt(2024, 5, 2),
        ..Default::default()
    };
    let mut envelopes = Vec::new();
    let summary = session(dir.path(), config).run(&mut envelopes).unwrap();

    assert_eq!(summary.segments_replayed, 1);
    assert_eq!(envelopes.iter().map(slot_of).collect::<Vec<_>>(), vec![9]);
}

#[test]
fn test_from_slot_suppresses_earlier_records() {
    let dir = TempDir::new().unwrap();
    write_log(dir.path(), "20240501-000000", Category::NewPair, &[pair(2), pair(7)]);
    write_log(dir.path(), "20240501-000000", Category::Swap, &[swap(3), swap(5)]);

    let config = ReplayConfig {
        from_date: NaiveDate::from_ymd_opt(2024, 5, 1),
        from_slot: Some(5),
        ..Default::default()
    };
    let mut envelopes = Vec::new();
    let summary = session(dir.path(), config).run(&mut envelopes).unwrap();

    assert_eq!(envelopes.iter().map(slot_of).collect::<Vec<_>>(), vec![5, 7]);
    assert_eq!(summary.first_slot, Some(Slot(5)));
    assert_eq!(summary.records_replayed, 4);
}

#[test]
fn test_remove_consumed_deletes_stream_files() {
    let dir = TempDir::new().unwrap();
    write_log(dir.path(), "seg", Category::NewPair, &[pair(1)]);
    write_log(dir.path(), "seg", Category::Swap, &[swap(2)]);

    let archive = DirArchive::new(dir.path()).with_remove_consumed(true);
    let session = ReplaySession::new(Arc::new(archive), ReplayConfig::default()).unwrap();
    session.run(Vec::<Envelope>::new()).unwrap();

    let seg = dir.path().join("seg");
    for _ in 0..100 {
        if fs::read_dir(&seg).unwrap().next().is_none() {
            return;
        }
        thread::sleep(std::time::Duration::from_millis(10));
    }
    panic!("consumed stream files were not removed");
}

#[test]
fn test_replay_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let pairs: Vec<String> = (1..=20).step_by(3).map(pair).collect();
    let swaps: Vec<String> = (1..=20).flat_map(|s| [swap(s), swap(s)]).collect();
    write_log(dir.path(), "a", Category::NewPair, &pairs);
    write_log(dir.path(), "a", Category::Swap, &swaps);
    write_log(dir.path(), "b", Category::Swap, &[swap(25)]);

    let run = || {
        let mut envelopes = Vec::new();
        let summary = session(dir.path(), ReplayConfig::default())
            .run(&mut envelopes)
            .unwrap();
        let frames: Vec<String> = envelopes.iter().map(|e| e.to_json().unwrap()).collect();
        (frames, summary.output_digest)
    };

    let (first, first_digest) = run();
    let (second, second_digest) = run();
    assert_eq!(first, second);
    assert_eq!(first_digest, second_digest);
}

#[test]
fn test_channel_sink_is_closed_when_replay_ends() {
    let dir = TempDir::new().unwrap();
    let lines: Vec<String> = (1..=50).map(swap).collect();
    write_log(dir.path(), "seg", Category::Swap, &lines);

    let session = session(dir.path(), ReplayConfig::default());
    let (tx, rx) = crossbeam_channel::bounded::<Envelope>(1);
    let handle = thread::spawn(move || session.run(tx));

    let received: Vec<u64> = rx.iter().map(|e| slot_of(&e)).collect();
    let summary = handle.join().unwrap().unwrap();

    assert_eq!(received, (1..=50).collect::<Vec<_>>());
    assert_eq!(summary.envelopes_emitted, 50);
}
