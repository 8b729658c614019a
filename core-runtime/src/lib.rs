//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the web client core:
//! - Event bus system (auth and identity state changes)
//! - API endpoint configuration
//! - Logging and tracing infrastructure
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the auth core depends on. It
//! establishes the logging conventions and event broadcasting mechanisms
//! used throughout the system.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{ApiConfig, ApiConfigBuilder};
pub use error::{Error, Result};
