//! Saving and loading the peers file.

use tracing::{debug, error, info, warn};

use super::manager::{AddressManager, Shared};
use crate::domain::{AddressManagerError, PersistenceError};

impl Shared {
    /// Persist the tables if anything changed since the last save.
    ///
    /// The snapshot is taken under the table lock; encoding and file I/O
    /// happen after it is released. Returns whether a save was written.
    pub(crate) fn save_peers(&self) -> Result<bool, PersistenceError> {
        let _guard = self.save_lock.lock();

        let (snapshot, generation) = {
            let book = self.book.lock();
            if !book.is_dirty() {
                return Ok(false);
            }
            (book.snapshot(), book.generation())
        };

        self.store.save(&snapshot)?;
        self.book.lock().mark_persisted(generation);
        debug!(
            "[addrmgr] Saved {} addresses to {}",
            snapshot.addresses.len(),
            self.store.location()
        );
        Ok(true)
    }

    /// `save_peers`, logging instead of returning the error. A failed save
    /// leaves the tables dirty so the next flush retries.
    pub(crate) fn save_peers_logged(&self) {
        if let Err(e) = self.save_peers() {
            error!(
                "[addrmgr] Failed to save peers to {}: {}",
                self.store.location(),
                e
            );
        }
    }

    /// Replace the tables with the stored snapshot.
    ///
    /// A missing file leaves the tables as they are. A corrupt one is
    /// deleted and the tables are reset under a fresh key. Holds the save
    /// lock throughout so no save interleaves with the reload; the table
    /// lock is taken only to swap in the result.
    pub(crate) fn load_peers(&self) {
        let _guard = self.save_lock.lock();
        let location = self.store.location();

        let result = match self.store.load() {
            Ok(Some(snapshot)) => self.book.lock().restore(snapshot).map(|()| true),
            Ok(None) => Ok(false),
            Err(e) => Err(e),
        };

        match result {
            Ok(true) => info!(
                "[addrmgr] Loaded {} addresses from file '{}'",
                self.book.lock().num_addresses(),
                location
            ),
            Ok(false) => debug!("[addrmgr] No peers file at '{}', starting empty", location),
            Err(e) => {
                error!("[addrmgr] Failed to parse file {}: {}", location, e);
                if let Err(remove_err) = self.store.remove() {
                    warn!(
                        "[addrmgr] Failed to remove corrupt peers file {}: {}",
                        location, remove_err
                    );
                }
                self.book.lock().reset();
            }
        }
    }
}

impl AddressManager {
    /// Write the tables to the peers file now, if they changed.
    ///
    /// Returns whether anything was written. The periodic flusher calls
    /// this on its own; direct calls are for embedders that want an extra
    /// save point.
    pub fn save_peers(&self) -> Result<bool, AddressManagerError> {
        Ok(self.shared.save_peers()?)
    }

    /// Reload the tables from the peers file, discarding in-memory state.
    ///
    /// `start` does this automatically.
    pub fn load_peers(&self) {
        self.shared.load_peers();
    }
}
