//! # Google Drive Provider
//!
//! Implements `SyncProvider` trait for Google Drive API v3.
//!
//! ## Overview
//!
//! This module provides:
//! - Media download by file id
//! - Multipart create and media update uploads, keyed on the local document id
//! - Change listing by modification time
//! - Rate limiting and exponential backoff through the host `HttpClient`

pub mod connector;
pub mod error;
pub mod types;

pub use connector::GoogleDriveConnector;
pub use error::{GoogleDriveError, Result};
