//! Core of the vein miner: block world access, vein discovery and the
//! per-player admission gate.
//!
//! Everything here is host-agnostic. The server crate wires these pieces to
//! inventories, permissions, rewards and configuration.

pub mod cache;
pub mod clock;
pub mod gate;
pub mod search;
pub mod world;
