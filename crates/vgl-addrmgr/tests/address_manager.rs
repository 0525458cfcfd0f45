//! # Address Manager Integration Tests
//!
//! Drive the public API end to end:
//!
//! 1. **Lifecycle**: start, periodic flush, final flush on stop, reload
//! 2. **Table Poisoning**: one source flooding one address group
//! 3. **Concurrency**: many callers while saves run

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use vgl_addrmgr::adapters::{JsonPeersFile, ManualTimeSource, SeededRandomSource};
use vgl_addrmgr::domain::address_manager::PeersSnapshot;
use vgl_addrmgr::{AddressManager, AddressManagerConfig, NetAddress, ServiceFlag, Timestamp};

const NOW: u64 = 1_700_000_000;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("vgl_addrmgr=debug")
        .with_test_writer()
        .try_init();
}

fn na(s: &str) -> NetAddress {
    NetAddress::parse(s, ServiceFlag::NODE_NETWORK, Timestamp::new(NOW)).unwrap()
}

fn manager(path: &Path, config: AddressManagerConfig, seed: u64) -> AddressManager {
    AddressManager::with_ports(
        config,
        Box::new(JsonPeersFile::new(path)),
        Arc::new(ManualTimeSource::new(NOW)),
        Box::new(SeededRandomSource::new(seed)),
    )
    .unwrap()
}

fn read_snapshot(path: &Path) -> PeersSnapshot {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

// =============================================================================
// LIFECYCLE
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_periodic_flush_writes_peers_file() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("peers.json");
    let config = AddressManagerConfig {
        dump_interval_secs: 1,
        ..AddressManagerConfig::for_testing()
    };
    let manager = manager(&path, config, 1);

    manager.start().unwrap();
    manager.add_address(&na("12.1.2.3:9108"), &na("173.144.173.111:9108"));

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(path.exists());
    assert_eq!(read_snapshot(&path).addresses.len(), 1);

    manager.stop().await.unwrap();
}

#[tokio::test]
async fn test_restart_keeps_tables_and_key() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("peers.json");
    let src = na("173.144.173.111:9108");

    let first = manager(&path, AddressManagerConfig::for_testing(), 1);
    first.start().unwrap();
    for i in 1..=30u8 {
        first.add_address(&na(&format!("12.{i}.7.7:9108")), &src);
    }
    first.good(&na("12.3.7.7:9108")).unwrap();
    let stats = first.stats();
    first.stop().await.unwrap();

    let snapshot = read_snapshot(&path);
    assert_eq!(snapshot.version, 1);
    assert_eq!(snapshot.new_buckets.len(), 1024);
    assert_eq!(snapshot.tried_buckets.len(), 64);

    let second = manager(&path, AddressManagerConfig::for_testing(), 99);
    second.start().unwrap();
    assert_eq!(second.stats(), stats);
    assert!(second.lookup(&na("12.3.7.7:9108")).unwrap().is_tried());
    assert_eq!(read_snapshot(&path).key, snapshot.key);
    second.stop().await.unwrap();
}

#[tokio::test]
async fn test_corrupt_file_on_start_begins_empty() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("peers.json");
    std::fs::write(&path, "{\"Version\": 1, \"Key\": []}").unwrap();

    let manager = manager(&path, AddressManagerConfig::for_testing(), 1);
    manager.start().unwrap();
    assert_eq!(manager.num_addresses(), 0);
    assert!(!path.exists());

    manager.stop().await.unwrap();
    // Final flush writes a fresh, valid file
    assert!(read_snapshot(&path).addresses.is_empty());
}

// =============================================================================
// TABLE POISONING
// =============================================================================

#[test]
fn test_single_group_flood_is_contained() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(
        &dir.path().join("peers.json"),
        AddressManagerConfig::for_testing(),
        1,
    );
    let attacker = na("99.99.1.1:9108");

    let flood: Vec<NetAddress> = (0..=255u8)
        .flat_map(|c| (1..=4u8).map(move |d| na(&format!("12.34.{c}.{d}:9108"))))
        .collect();
    manager.add_addresses(&flood, &attacker);

    // One address group from one source lands in a single New bucket
    assert!(manager.num_addresses() <= 64);

    let honest = na("55.1.2.3:9108");
    manager.add_address(&honest, &na("173.144.173.111:9108"));
    assert!(manager.lookup(&honest).is_some());
}

// =============================================================================
// CONCURRENCY
// =============================================================================

#[test]
fn test_concurrent_callers_and_saves() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("peers.json");
    let manager = Arc::new(manager(&path, AddressManagerConfig::for_testing(), 1));

    let mut workers = Vec::new();
    for w in 0..4u8 {
        let manager = Arc::clone(&manager);
        workers.push(thread::spawn(move || {
            let src = na(&format!("173.{}.1.1:9108", 100 + w));
            for i in 0..100u8 {
                let addr = na(&format!("{}.{}.1.1:9108", 20 + w, i));
                manager.add_address(&addr, &src);
                if let Some(candidate) = manager.get_address() {
                    let _ = manager.attempt(candidate.na());
                    if i % 3 == 0 {
                        let _ = manager.good(candidate.na());
                    }
                }
            }
        }));
    }

    let saver = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || {
            for _ in 0..20 {
                manager.save_peers().unwrap();
                thread::sleep(Duration::from_millis(1));
            }
        })
    };

    for worker in workers {
        worker.join().unwrap();
    }
    saver.join().unwrap();

    let stats = manager.stats();
    assert_eq!(stats.total(), manager.num_addresses());
    assert!(stats.tried_count > 0);

    manager.save_peers().unwrap();
    let reloaded = self::manager(&path, AddressManagerConfig::for_testing(), 2);
    reloaded.load_peers();
    assert_eq!(reloaded.stats(), stats);
}
