//! # OneDrive Provider
//!
//! Implements `SyncProvider` trait for Microsoft Graph API (OneDrive).
//!
//! ## Overview
//!
//! This module provides:
//! - Path-addressed uploads below a configurable drive folder
//! - Content download by drive item id
//! - Change listing through Graph delta queries
//! - Throttling reported with the server's `Retry-After`

pub mod connector;
pub mod error;
pub mod types;

pub use connector::OneDriveConnector;
pub use error::{OneDriveError, Result};
