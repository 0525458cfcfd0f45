//! Tests for the address manager service

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use super::*;
use crate::adapters::{JsonPeersFile, ManualTimeSource, SeededRandomSource};
use crate::domain::address_manager::{AddressManagerConfig, PeersSnapshot};
use crate::domain::local_address::AddressPriority;
use crate::domain::net_address::{filter, NetAddress, ServiceFlag};
use crate::domain::{AddressManagerError, PersistenceError, Timestamp};
use crate::ports::PeerStore;

const NOW: u64 = 1_700_000_000;

fn na(s: &str) -> NetAddress {
    NetAddress::parse(s, ServiceFlag::NODE_NETWORK, Timestamp::new(NOW)).unwrap()
}

fn src() -> NetAddress {
    na("173.144.173.111:9108")
}

fn manager_with_store(
    store: Box<dyn PeerStore>,
    seed: u64,
) -> (AddressManager, Arc<ManualTimeSource>) {
    let clock = Arc::new(ManualTimeSource::new(NOW));
    let manager = AddressManager::with_ports(
        AddressManagerConfig::for_testing(),
        store,
        clock.clone(),
        Box::new(SeededRandomSource::new(seed)),
    )
    .unwrap();
    (manager, clock)
}

fn manager_at(path: &std::path::Path, seed: u64) -> (AddressManager, Arc<ManualTimeSource>) {
    manager_with_store(Box::new(JsonPeersFile::new(path)), seed)
}

fn key_of(manager: &AddressManager) -> [u8; 32] {
    *manager.shared.book.lock().key()
}

/// Store whose writes can be made to fail.
struct FlakyStore {
    inner: JsonPeersFile,
    fail: AtomicBool,
}

impl PeerStore for Arc<FlakyStore> {
    fn load(&self) -> Result<Option<PeersSnapshot>, PersistenceError> {
        self.inner.load()
    }

    fn save(&self, snapshot: &PeersSnapshot) -> Result<(), PersistenceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PersistenceError::io(
                self.inner.path(),
                std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            ));
        }
        self.inner.save(snapshot)
    }

    fn remove(&self) -> Result<(), PersistenceError> {
        self.inner.remove()
    }

    fn location(&self) -> String {
        self.inner.location()
    }
}

/// Store whose first save parks between two gate crossings.
struct GatedStore {
    inner: JsonPeersFile,
    gated: AtomicBool,
    gate: Barrier,
}

impl PeerStore for Arc<GatedStore> {
    fn load(&self) -> Result<Option<PeersSnapshot>, PersistenceError> {
        self.inner.load()
    }

    fn save(&self, snapshot: &PeersSnapshot) -> Result<(), PersistenceError> {
        if self.gated.swap(false, Ordering::SeqCst) {
            self.gate.wait();
            self.gate.wait();
        }
        self.inner.save(snapshot)
    }

    fn remove(&self) -> Result<(), PersistenceError> {
        self.inner.remove()
    }

    fn location(&self) -> String {
        self.inner.location()
    }
}

// =============================================================================
// TEST GROUP 1: Table Operations
// =============================================================================

#[test]
fn test_need_more_addresses() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, _) = manager_at(&dir.path().join("peers.json"), 1);
    assert!(manager.need_more_addresses());

    let addrs: Vec<_> = (1..=10u8).map(|i| na(&format!("12.{i}.1.1:9108"))).collect();
    manager.add_addresses(&addrs, &src());
    assert_eq!(manager.num_addresses(), 10);
    assert!(!manager.need_more_addresses());
}

#[test]
fn test_outcomes_for_unknown_address() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, _) = manager_at(&dir.path().join("peers.json"), 1);
    let unknown = na("12.1.2.3:9108");
    assert!(matches!(
        manager.attempt(&unknown),
        Err(AddressManagerError::AddressNotFound(_))
    ));
    assert!(matches!(
        manager.connected(&unknown),
        Err(AddressManagerError::AddressNotFound(_))
    ));
    assert!(matches!(
        manager.good(&unknown),
        Err(AddressManagerError::AddressNotFound(_))
    ));
    assert!(matches!(
        manager.set_services(&unknown, ServiceFlag::NODE_CF),
        Err(AddressManagerError::AddressNotFound(_))
    ));
}

#[test]
fn test_clock_drives_attempt_and_good() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, clock) = manager_at(&dir.path().join("peers.json"), 1);
    let addr = na("12.1.2.3:9108");
    manager.add_address(&addr, &src());

    clock.advance(30);
    manager.attempt(&addr).unwrap();
    let ka = manager.lookup(&addr).unwrap();
    assert_eq!(ka.last_attempt(), Some(Timestamp::new(NOW + 30)));

    clock.advance(30);
    manager.good(&addr).unwrap();
    let ka = manager.lookup(&addr).unwrap();
    assert_eq!(ka.last_success(), Some(Timestamp::new(NOW + 60)));
    assert!(ka.is_tried());
}

#[test]
fn test_snapshot_is_isolated_from_updates() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, _) = manager_at(&dir.path().join("peers.json"), 1);
    let addr = na("12.1.2.3:9108");
    manager.add_address(&addr, &src());

    let picked = manager.get_address().unwrap();
    manager.set_services(&addr, ServiceFlag::NODE_BLOOM).unwrap();
    manager.attempt(&addr).unwrap();

    assert_eq!(picked.na().services(), ServiceFlag::NODE_NETWORK);
    assert_eq!(picked.attempts(), 0);
    assert_eq!(
        manager.lookup(&addr).unwrap().na().services(),
        ServiceFlag::NODE_BLOOM
    );
}

#[test]
fn test_address_cache_uses_config() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, _) = manager_at(&dir.path().join("peers.json"), 1);
    for i in 1..=20u8 {
        let addr = na(&format!("12.{i}.1.1:9108"));
        manager.add_address(&addr, &src());
        manager.good(&addr).unwrap();
    }
    // ceil(20 * 23%) = 5
    assert_eq!(manager.address_cache(filter::all).len(), 5);
    assert!(manager.address_cache(filter::ipv6_only).is_empty());
}

#[test]
fn test_local_addresses() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, _) = manager_at(&dir.path().join("peers.json"), 1);
    let local = na("14.1.2.3:9108");

    assert!(manager
        .add_local_address(&na("10.0.0.1:9108"), AddressPriority::Manual)
        .is_err());
    manager
        .add_local_address(&local, AddressPriority::Upnp)
        .unwrap();

    assert!(manager.has_local_address(&local));
    assert_eq!(manager.local_addresses().len(), 1);
    assert_eq!(manager.stats().local_count, 1);
    assert_eq!(
        manager.get_best_local_address(&na("12.1.2.3:9108"), filter::all),
        local
    );

    let (good, _) = manager.is_external_addr_candidate(&local, &na("12.1.2.3:9108"));
    assert!(good);
}

// =============================================================================
// TEST GROUP 2: Persistence
// =============================================================================

#[test]
fn test_save_only_when_dirty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("peers.json");
    let (manager, _) = manager_at(&path, 1);

    assert!(manager.save_peers().unwrap());
    assert!(path.exists());
    assert!(!manager.save_peers().unwrap());

    manager.add_address(&na("12.1.2.3:9108"), &src());
    assert!(manager.save_peers().unwrap());
    assert!(!manager.save_peers().unwrap());
}

#[test]
fn test_save_and_reload_restores_tables() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("peers.json");

    let (first, _) = manager_at(&path, 1);
    for i in 1..=12u8 {
        first.add_address(&na(&format!("12.{i}.1.1:9108")), &src());
    }
    first.good(&na("12.1.1.1:9108")).unwrap();
    first.attempt(&na("12.2.1.1:9108")).unwrap();
    first.save_peers().unwrap();

    let (second, _) = manager_at(&path, 2);
    assert_ne!(key_of(&second), key_of(&first));
    second.load_peers();

    assert_eq!(key_of(&second), key_of(&first));
    assert_eq!(second.stats(), first.stats());
    assert!(second.lookup(&na("12.1.1.1:9108")).unwrap().is_tried());
    assert_eq!(second.lookup(&na("12.2.1.1:9108")).unwrap().attempts(), 1);
    // Freshly loaded state needs no save
    assert!(!second.save_peers().unwrap());
}

#[test]
fn test_corrupt_file_is_removed_and_reset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("peers.json");
    std::fs::write(&path, b"\x00\x01 definitely not json").unwrap();

    let (manager, _) = manager_at(&path, 1);
    manager.add_address(&na("12.1.2.3:9108"), &src());
    let key_before = key_of(&manager);

    manager.load_peers();

    assert!(!path.exists());
    assert_eq!(manager.num_addresses(), 0);
    assert_ne!(key_of(&manager), key_before);
}

#[test]
fn test_invalid_snapshot_is_treated_as_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("peers.json");

    let (writer, _) = manager_at(&path, 1);
    writer.add_address(&na("12.1.2.3:9108"), &src());
    writer.save_peers().unwrap();

    let mut snapshot: PeersSnapshot =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    snapshot.version = 9;
    std::fs::write(&path, serde_json::to_vec(&snapshot).unwrap()).unwrap();

    let (reader, _) = manager_at(&path, 2);
    reader.load_peers();
    assert!(!path.exists());
    assert_eq!(reader.num_addresses(), 0);
}

#[test]
fn test_load_during_save_keeps_file_and_memory_in_step() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("peers.json");

    let (other, _) = manager_at(&path, 3);
    other.add_address(&na("12.9.9.9:9108"), &src());
    other.save_peers().unwrap();

    let store = Arc::new(GatedStore {
        inner: JsonPeersFile::new(&path),
        gated: AtomicBool::new(true),
        gate: Barrier::new(2),
    });
    let (manager, _) = manager_with_store(Box::new(Arc::clone(&store)), 1);
    let manager = Arc::new(manager);
    manager.add_address(&na("12.1.2.3:9108"), &src());

    let saver = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || manager.save_peers().unwrap())
    };
    // Saver is now inside the store
    store.gate.wait();
    let loader = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || manager.load_peers())
    };
    thread::sleep(Duration::from_millis(50));
    store.gate.wait();

    assert!(saver.join().unwrap());
    loader.join().unwrap();

    let on_disk: PeersSnapshot = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    let keys: Vec<&str> = on_disk.addresses.iter().map(|a| a.addr.as_str()).collect();
    assert_eq!(keys, vec!["12.1.2.3:9108"]);
    assert!(manager.lookup(&na("12.1.2.3:9108")).is_some());
    assert!(manager.lookup(&na("12.9.9.9:9108")).is_none());
    assert!(!manager.save_peers().unwrap());
}

#[test]
fn test_failed_save_stays_dirty() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FlakyStore {
        inner: JsonPeersFile::new(dir.path().join("peers.json")),
        fail: AtomicBool::new(true),
    });

    let (manager, _) = manager_with_store(Box::new(Arc::clone(&store)), 1);
    manager.add_address(&na("12.1.2.3:9108"), &src());

    assert!(matches!(
        manager.save_peers(),
        Err(AddressManagerError::Persistence(PersistenceError::Io { .. }))
    ));

    store.fail.store(false, Ordering::SeqCst);
    assert!(manager.save_peers().unwrap());
    assert!(!manager.save_peers().unwrap());
}

// =============================================================================
// TEST GROUP 3: Lifecycle
// =============================================================================

#[test]
fn test_start_requires_runtime() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, _) = manager_at(&dir.path().join("peers.json"), 1);
    assert!(matches!(manager.start(), Err(AddressManagerError::NoRuntime)));
    assert!(!manager.is_started());
}

#[tokio::test]
async fn test_stop_flushes_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("peers.json");
    let (manager, _) = manager_at(&path, 1);

    manager.start().unwrap();
    manager.start().unwrap();
    assert!(manager.is_started());

    manager.add_address(&na("12.1.2.3:9108"), &src());
    manager.stop().await.unwrap();
    manager.stop().await.unwrap();

    let snapshot: PeersSnapshot = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(snapshot.addresses.len(), 1);
    assert_eq!(snapshot.addresses[0].addr, "12.1.2.3:9108");
}

#[tokio::test]
async fn test_start_loads_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("peers.json");

    let (first, _) = manager_at(&path, 1);
    first.add_address(&na("12.1.2.3:9108"), &src());
    first.save_peers().unwrap();

    let (second, _) = manager_at(&path, 2);
    second.start().unwrap();
    assert_eq!(second.num_addresses(), 1);
    second.stop().await.unwrap();
}

#[test]
fn test_with_config_rejects_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let config = AddressManagerConfig {
        tried_bucket_size: 0,
        ..AddressManagerConfig::default()
    };
    assert!(matches!(
        AddressManager::with_config(dir.path(), config),
        Err(AddressManagerError::Config(_))
    ));
}
