//! # Ports Layer - Hexagonal Architecture Boundaries
//!
//! The address manager only needs driven ports: the service in
//! [`crate::service`] is its own driving API.

pub mod outbound;

pub use outbound::{shuffle, PeerStore, RandomSource, TimeSource};
