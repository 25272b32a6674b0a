//! Adsignal Common - Shared types, configuration and logging for the
//! adsignal enrichment pipeline.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Error types and handling utilities
//! - Logging setup

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;

pub use config::{Config, LlmConfig, PathsConfig};
pub use error::{Error, Result, ResultExt};
pub use logging::init_logging;
