//! Address manager types.

/// Index of a record in the address arena.
///
/// Only meaningful to the [`AddressBook`](super::AddressBook) that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressHandle(pub(crate) usize);

/// Statistics about the address manager state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddressManagerStats {
    /// Addresses in the New table
    pub new_count: usize,
    /// Addresses in the Tried table
    pub tried_count: usize,
    /// Registered local addresses
    pub local_count: usize,
}

impl AddressManagerStats {
    /// Total known addresses.
    pub fn total(&self) -> usize {
        self.new_count + self.tried_count
    }
}
