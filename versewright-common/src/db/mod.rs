//! Database layer: pool initialization, entitlement store, poem repository

pub mod entitlements;
pub mod init;
pub mod poems;

pub use init::{connect_memory, init_database};
