//! Address manager service state and construction.

use std::path::Path;
use std::sync::atomic::AtomicU32;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::adapters::{JsonPeersFile, OsRandomSource, SystemTimeSource};
use crate::domain::address_manager::{AddressBook, AddressManagerConfig};
use crate::domain::local_address::LocalAddressTable;
use crate::domain::AddressManagerError;
use crate::ports::{PeerStore, RandomSource, TimeSource};

/// State shared between callers and the background flush task.
pub(crate) struct Shared {
    /// New/Tried tables. Held only for in-memory work, never across I/O.
    pub(crate) book: Mutex<AddressBook>,
    /// Serialises saves so an older snapshot never overwrites a newer one.
    pub(crate) save_lock: Mutex<()>,
    pub(crate) store: Box<dyn PeerStore>,
    pub(crate) time_source: Arc<dyn TimeSource>,
    pub(crate) config: AddressManagerConfig,
}

/// Concurrency-safe peer address manager.
///
/// Tracks gossiped addresses in keyed New/Tried tables, hands out
/// connection candidates, records connection outcomes, chooses which of
/// our own addresses to advertise, and keeps the tables in a peers file
/// across restarts.
///
/// # Example
///
/// ```rust,no_run
/// use vgl_addrmgr::{AddressManager, NetAddress, ServiceFlag, Timestamp};
///
/// # async fn run() -> Result<(), vgl_addrmgr::AddressManagerError> {
/// let manager = AddressManager::new("/var/lib/vigil");
/// manager.start()?;
///
/// let seen = Timestamp::new(0);
/// let src = NetAddress::parse("173.144.173.111:9108", ServiceFlag::NODE_NETWORK, seen)?;
/// let addr = NetAddress::parse("12.1.2.3:9108", ServiceFlag::NODE_NETWORK, seen)?;
/// manager.add_address(&addr, &src);
///
/// if let Some(candidate) = manager.get_address() {
///     manager.attempt(candidate.na())?;
/// }
/// manager.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct AddressManager {
    pub(crate) shared: Arc<Shared>,
    pub(crate) local: RwLock<LocalAddressTable>,
    pub(crate) started: AtomicU32,
    pub(crate) shutdown: AtomicU32,
    pub(crate) shutdown_tx: watch::Sender<bool>,
    pub(crate) handler: Mutex<Option<JoinHandle<()>>>,
}

impl AddressManager {
    /// Manager keeping `peers.json` in `data_dir`, with default settings.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        let config = AddressManagerConfig::default();
        let store = JsonPeersFile::new(data_dir.as_ref().join(&config.peers_filename));
        Self::build(
            config,
            Box::new(store),
            Arc::new(SystemTimeSource::new()),
            Box::new(OsRandomSource::new()),
        )
    }

    /// Manager keeping its peers file in `data_dir`, with `config`.
    pub fn with_config<P: AsRef<Path>>(
        data_dir: P,
        config: AddressManagerConfig,
    ) -> Result<Self, AddressManagerError> {
        config.validate()?;
        let store = JsonPeersFile::new(data_dir.as_ref().join(&config.peers_filename));
        Ok(Self::build(
            config,
            Box::new(store),
            Arc::new(SystemTimeSource::new()),
            Box::new(OsRandomSource::new()),
        ))
    }

    /// Manager over explicit ports. Used by tests and embedders with their
    /// own clock, randomness, or storage.
    pub fn with_ports(
        config: AddressManagerConfig,
        store: Box<dyn PeerStore>,
        time_source: Arc<dyn TimeSource>,
        rng: Box<dyn RandomSource>,
    ) -> Result<Self, AddressManagerError> {
        config.validate()?;
        Ok(Self::build(config, store, time_source, rng))
    }

    fn build(
        config: AddressManagerConfig,
        store: Box<dyn PeerStore>,
        time_source: Arc<dyn TimeSource>,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        info!(
            "[addrmgr] Initializing address manager (peers file: {})",
            store.location()
        );
        let (shutdown_tx, _) = watch::channel(false);
        let book = AddressBook::new(config.tried_bucket_size, rng);
        Self {
            shared: Arc::new(Shared {
                book: Mutex::new(book),
                save_lock: Mutex::new(()),
                store,
                time_source,
                config,
            }),
            local: RwLock::new(LocalAddressTable::new()),
            started: AtomicU32::new(0),
            shutdown: AtomicU32::new(0),
            shutdown_tx,
            handler: Mutex::new(None),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &AddressManagerConfig {
        &self.shared.config
    }
}
