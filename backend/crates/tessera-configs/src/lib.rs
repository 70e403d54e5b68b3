//! tessera-configs
//!
//! Configuration types and loader for Tessera.

pub mod config;

pub use config::*;
pub use config::defaults;
