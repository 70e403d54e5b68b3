//! Tessera server library.
//!
//! Exposes the bootstrap and logging modules for integration testing.

pub mod lifecycle;
pub mod logging;
