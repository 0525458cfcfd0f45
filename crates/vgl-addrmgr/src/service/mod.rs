//! # Service Layer
//!
//! [`AddressManager`] wraps the domain tables in locks, injects the clock,
//! and owns the periodic flush task.

mod api;
mod lifecycle;
mod local;
mod manager;
mod persistence;

pub use manager::AddressManager;

#[cfg(test)]
mod tests;
