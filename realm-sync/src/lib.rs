//! Event bus and client synchronization for the REALM core.
//!
//! This crate connects remote surfaces (browser previews, panels,
//! editor hosts) to the transaction engine:
//! - [`EventBus`]: ordered, single-drain pub/sub for in-process
//!   notification
//! - [`SyncClient`]: the duplex channel contract a transport implements
//! - [`SyncEngine`]: per-client dedup, preview mirroring, and the
//!   commit-request pipeline into the [`realm_engine::TransactionManager`]
//!
//! The engine never does transport I/O itself; it talks to clients only
//! through the [`SyncClient`] trait and reports conflicts through a
//! pluggable [`ConflictResolver`].

mod bus;
mod client;
mod engine;
mod error;
mod policy;

pub use bus::{EventBus, EventHandler, SubscriptionToken};
pub use client::SyncClient;
pub use engine::{SyncConfig, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use policy::{ConflictDecision, ConflictResolver, ReportOnly};

pub use client::mock;
