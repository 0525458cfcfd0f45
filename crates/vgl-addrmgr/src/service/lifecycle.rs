//! Start/stop and the periodic flush task.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info, trace, warn};

use super::manager::{AddressManager, Shared};
use crate::domain::AddressManagerError;

impl AddressManager {
    /// Load the peers file and begin flushing every `dump_interval_secs`.
    ///
    /// Must be called from within a Tokio runtime. Calling it again is a
    /// no-op.
    pub fn start(&self) -> Result<(), AddressManagerError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| AddressManagerError::NoRuntime)?;

        if self.started.fetch_add(1, Ordering::SeqCst) != 0 {
            return Ok(());
        }

        trace!("[addrmgr] Starting address manager");
        self.shared.load_peers();

        let handle = runtime.spawn(address_handler(
            Arc::clone(&self.shared),
            self.shutdown_tx.subscribe(),
        ));
        *self.handler.lock() = Some(handle);
        Ok(())
    }

    /// Stop the flush task after one final save, and wait for it.
    ///
    /// A second call only logs a warning.
    pub async fn stop(&self) -> Result<(), AddressManagerError> {
        if self.shutdown.fetch_add(1, Ordering::SeqCst) != 0 {
            warn!("[addrmgr] Address manager is already in the process of shutting down");
            return Ok(());
        }

        info!("[addrmgr] Address manager shutting down");
        self.shutdown_tx.send_replace(true);

        let handle = self.handler.lock().take();
        if let Some(handle) = handle {
            handle
                .await
                .map_err(|e| AddressManagerError::Shutdown(e.to_string()))?;
        }
        Ok(())
    }

    /// Whether `start` has been called.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst) != 0
    }
}

/// Flush on every tick until shutdown, then flush once more.
async fn address_handler(shared: Arc<Shared>, mut shutdown: watch::Receiver<bool>) {
    let period = shared.config.dump_interval();
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            _ = ticker.tick() => flush(&shared).await,
            _ = shutdown.changed() => break,
        }
    }

    flush(&shared).await;
    trace!("[addrmgr] Address handler done");
}

/// Save on the blocking pool so file I/O never stalls the runtime.
async fn flush(shared: &Arc<Shared>) {
    let shared = Arc::clone(shared);
    if let Err(e) = tokio::task::spawn_blocking(move || shared.save_peers_logged()).await {
        error!("[addrmgr] Peers flush task failed: {}", e);
    }
}
