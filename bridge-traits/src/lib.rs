//! # Host Bridge Traits
//!
//! Capability contracts between the document sync engine and the host it runs in.
//!
//! ## Overview
//!
//! The engine never talks to the filesystem, the network or the wall clock
//! directly. Each of those capabilities is expressed as a trait here and
//! implemented per host (see `bridge-desktop` for the tokio/reqwest versions).
//! Keeping the seams in one crate lets the engine be tested against in-memory
//! or scripted implementations.
//!
//! ## Traits
//!
//! ### Networking & I/O
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations used by cloud providers
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Local file I/O for the content store
//!
//! ### External storage systems
//! - [`SyncProvider`](provider::SyncProvider) - Uniform fetch/upload/list-changes contract
//!   implemented once per [`ExternalSystem`](provider::ExternalSystem)
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Implementations
//! should convert platform-specific errors into it and keep the message actionable
//! (file path, HTTP status, remote id), because the sync engine copies provider
//! messages verbatim into its audit log.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! across tokio tasks behind an `Arc`.
//!
//! ## Examples
//!
//! ### Implementing SyncProvider
//!
//! ```ignore
//! use bridge_traits::provider::{ExternalSystem, RemoteChange, SyncProvider, UploadMetadata};
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//! use bytes::Bytes;
//! use chrono::{DateTime, Utc};
//!
//! pub struct MyDmsProvider;
//!
//! #[async_trait]
//! impl SyncProvider for MyDmsProvider {
//!     fn system(&self) -> ExternalSystem {
//!         ExternalSystem::GoogleDrive
//!     }
//!
//!     async fn fetch(&self, external_id: &str) -> Result<Bytes> {
//!         todo!()
//!     }
//!
//!     async fn upload(&self, local_doc_id: &str, content: Bytes, metadata: &UploadMetadata) -> Result<String> {
//!         todo!()
//!     }
//!
//!     async fn list_changes(&self, since: DateTime<Utc>) -> Result<Vec<RemoteChange>> {
//!         todo!()
//!     }
//! }
//! ```

pub mod error;
pub mod http;
pub mod provider;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use provider::{ExternalSystem, RemoteChange, SyncProvider, UploadMetadata};
pub use storage::{FileMetadata, FileSystemAccess};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
