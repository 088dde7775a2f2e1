// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::Arc;
use std::thread;

use tempfile::tempdir;

use crate::event::Event;
use crate::store::{InMemoryStore, Store, WalStore};
use crate::wal::WalOptions;

fn starts(events: &[Event]) -> Vec<i64> {
    events.iter().map(|e| e.start).collect()
}

#[test]
fn test_in_memory_store() {
    let store = InMemoryStore::new();
    for start in [3, 4, 2, 1] {
        store.write(Event::at(start)).unwrap();
    }
    assert_eq!(starts(&store.read(3, 4).unwrap()), vec![3, 4]);
    assert_eq!(store.read(4, 3).unwrap(), store.read(3, 4).unwrap());

    store.delete("3").unwrap();
    store.delete("nope").unwrap();
    assert_eq!(starts(&store.list().unwrap()), vec![1, 2, 4]);
}

#[test]
fn test_store_as_trait_object() {
    let dir = tempdir().unwrap();
    let stores: Vec<Box<dyn Store>> = vec![
        Box::new(InMemoryStore::new()),
        Box::new(WalStore::open(dir.path().join("wal")).unwrap()),
    ];
    for store in &stores {
        store.write(Event::at(10).with_category("Formula")).unwrap();
        store.write(Event::at(5).with_category("Sleep")).unwrap();
        store.delete("5Sleep").unwrap();
        let events = store.read(0, 100).unwrap();
        assert_eq!(events, vec![Event::at(10).with_id("10Formula").with_category("Formula")]);
    }
}

#[test]
fn test_wal_store_survives_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.log");
    let expected = {
        let store = WalStore::open(&path).unwrap();
        store.write(Event::at(1).with_actor("kid").with_category("Formula").with_quantity(120, "ml")).unwrap();
        store.write(Event::at(2).with_id("nap").with_category("Sleep")).unwrap();
        store.write(Event::at(3).with_id("nap").with_category("Sleep")).unwrap();
        store.write(Event::at(4).with_category("Diaper")).unwrap();
        store.delete("4Diaper").unwrap();
        store.memory().list().unwrap()
    };
    assert_eq!(starts(&expected), vec![1, 3]);

    let reopened = WalStore::open(&path).unwrap();
    assert_eq!(reopened.memory().list().unwrap(), expected);
    assert_eq!(reopened.read(0, 10).unwrap(), expected);
}

#[test]
fn test_logged_but_unapplied_write_is_recovered() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal");
    {
        let store = WalStore::open(&path).unwrap();
        store.write(Event::at(1)).unwrap();
        // Crash between log append and memory apply.
        store.wal().write(&Event::at(2)).unwrap();
        assert_eq!(store.memory().len().unwrap(), 1);
    }
    let store = WalStore::open(&path).unwrap();
    assert_eq!(starts(&store.read(0, 10).unwrap()), vec![1, 2]);
}

#[test]
fn test_compact_keeps_memory_and_log_in_step() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal");
    let store = WalStore::open(&path).unwrap();
    for i in 0..20 {
        store.write(Event::at(i % 4).with_quantity(i, "ml")).unwrap();
    }
    store.delete("0").unwrap();

    let stats = store.compact().unwrap();
    assert_eq!(stats.records_read, 21);
    assert_eq!(stats.events_written, 3);
    assert_eq!(store.wal().replay().unwrap(), store.memory().snapshot().unwrap());

    store.write(Event::at(9)).unwrap();
    assert_eq!(store.wal().replay().unwrap(), store.memory().snapshot().unwrap());
}

#[test]
fn test_concurrent_writers_and_readers() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wal");
    let store = Arc::new(
        WalStore::open_with(
            &path,
            WalOptions {
                sync_on_append: false,
            },
        )
        .unwrap(),
    );

    let mut handles = Vec::new();
    for writer in 0..4i64 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for i in 0..25 {
                store
                    .write(Event::at(i).with_actor(format!("w{}", writer)))
                    .unwrap();
            }
        }));
    }
    for _ in 0..4 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for _ in 0..50 {
                let events = store.read(0, 100).unwrap();
                assert!(events.windows(2).all(|w| w[0].order(&w[1]).is_le()));
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(store.memory().len().unwrap(), 100);
    let live = store.memory().snapshot().unwrap();
    assert_eq!(store.wal().replay().unwrap(), live);

    drop(store);
    let reopened = WalStore::open(&path).unwrap();
    assert_eq!(reopened.memory().snapshot().unwrap(), live);
}
