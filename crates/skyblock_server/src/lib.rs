//! # Skyblock Server
//!
//! Host harness for the island grid: configuration, command line, logging,
//! signal handling and the single-owner runtime loop that ticks, autosaves
//! and saves again on shutdown.

pub mod cli;
pub mod config;
pub mod logging;
pub mod runtime;
pub mod signals;

pub use cli::CliArgs;
pub use config::{AppConfig, LoggingSettings, RuntimeSettings, StorageSettings};
pub use runtime::{LogOnlyRegenerator, RuntimeCommand, RuntimeHandle, RuntimeStats, SkyblockRuntime};
