//! Core abstractions for vsx-mirror.
//!
//! This crate provides the pieces the sync engine builds on:
//! - **Identifiers**: validated `namespace.name` pairs
//! - **Data model**: package and version metadata as served by Open VSX
//! - **Registry trait**: read/write access to one registry instance
//! - **HTTP client**: the `reqwest`-backed [`HttpRegistry`]
//! - **Error types**: one error enum shared by every crate
//!
//! # Examples
//!
//! ```no_run
//! use vsx_core::{HttpRegistry, PackageIdentifier, Registry};
//!
//! # async fn example() -> vsx_core::Result<()> {
//! let id: PackageIdentifier = "golang.Go".parse()?;
//! let upstream = HttpRegistry::new("https://open-vsx.org")?;
//! let metadata = upstream.get_metadata(id.namespace(), id.name()).await?;
//!
//! for link in &metadata.all_versions {
//!     println!("{} -> {}", link.version, link.url);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod http;
pub mod identifier;
pub mod registry;
pub mod types;

// Re-export commonly used types
pub use error::{MirrorError, Result};
pub use http::HttpRegistry;
pub use identifier::PackageIdentifier;
pub use registry::{NamespaceOutcome, PublishOutcome, Registry};
pub use types::{Lookup, PackageMetadata, VersionLink, VersionMetadata};
