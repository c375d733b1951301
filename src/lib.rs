//! Workspace façade crate.
//!
//! Exposes the feature flags that map to the individual workspace crates
//! (`desktop-shims`, `google-drive`, `onedrive`) and re-exports the bootstrap
//! API of `core-service`. Host applications can depend on `docsync-workspace`
//! and enable the features they need without wiring each crate individually.

#[cfg(any(feature = "desktop-shims", feature = "google-drive", feature = "onedrive"))]
pub use core_service::*;
