//! JSON peers file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::address_manager::PeersSnapshot;
use crate::domain::PersistenceError;
use crate::ports::PeerStore;

/// Stores the peers snapshot as a JSON document on disk.
///
/// Writes go to `<path>.new` first, are synced, then renamed over `path`,
/// so a crash mid-write leaves the previous file intact.
#[derive(Debug, Clone)]
pub struct JsonPeersFile {
    path: PathBuf,
}

impl JsonPeersFile {
    /// Peers file at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Location of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".new");
        PathBuf::from(name)
    }
}

impl PeerStore for JsonPeersFile {
    fn load(&self) -> Result<Option<PeersSnapshot>, PersistenceError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("[addrmgr] No peers file at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(PersistenceError::io(&self.path, e)),
        };
        let snapshot = serde_json::from_slice(&bytes)?;
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &PeersSnapshot) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| PersistenceError::io(parent, e))?;
            }
        }

        let bytes = serde_json::to_vec(snapshot)?;
        let temp_path = self.temp_path();
        let mut file =
            fs::File::create(&temp_path).map_err(|e| PersistenceError::io(&temp_path, e))?;
        file.write_all(&bytes)
            .map_err(|e| PersistenceError::io(&temp_path, e))?;
        file.sync_all()
            .map_err(|e| PersistenceError::io(&temp_path, e))?;
        drop(file);

        fs::rename(&temp_path, &self.path).map_err(|e| PersistenceError::io(&self.path, e))?;
        Ok(())
    }

    fn remove(&self) -> Result<(), PersistenceError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistenceError::io(&self.path, e)),
        }
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
