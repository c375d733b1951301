//! # Core Runtime Module
//!
//! Provides the ambient runtime infrastructure for the document sync engine:
//! - Logging and tracing infrastructure
//! - Configuration management
//!
//! ## Overview
//!
//! Every other engine crate depends on this one for its logging conventions
//! and for the validated [`DocSyncConfig`](config::DocSyncConfig) that the
//! bootstrap façade turns into a running service.

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
