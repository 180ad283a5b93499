//! Cartwheel Core - Shared cart domain types.
//!
//! This crate provides the types every Cartwheel component agrees on:
//! - `sync` - Cart synchronization engine and remote API transport
//! - `cli` - Command-line front end for the engine
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no shared state. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, sizes, quantities, prices, line items, snapshots,
//!   product summaries, and the display enrichment join

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
