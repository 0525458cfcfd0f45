//! # Adapters Layer
//!
//! Implementations of the driven ports.
//!
//! | Port | Production | Testing |
//! |------|------------|---------|
//! | `TimeSource` | `SystemTimeSource` | `ManualTimeSource` |
//! | `RandomSource` | `OsRandomSource` | `SeededRandomSource` |
//! | `PeerStore` | `JsonPeersFile` | `JsonPeersFile` in a temp dir |

pub mod config;
pub mod peers_file;
pub mod random;
pub mod time;

pub use config::TomlConfigProvider;
pub use peers_file::JsonPeersFile;
pub use random::{OsRandomSource, SeededRandomSource};
pub use time::{ManualTimeSource, SystemTimeSource};
