//! `chronod-core` — shared configuration for the chronod scheduler daemon.
//!
//! Holds the figment-based config loader (`chronod.toml` + `CHRONOD_*` env
//! overrides) and the defaults every subsystem agrees on. Domain types live
//! in the crates that own them.

pub mod config;
pub mod error;

pub use config::ChronodConfig;
pub use error::{CoreError, Result};
