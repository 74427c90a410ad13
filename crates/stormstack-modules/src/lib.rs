//! stormstack-modules — the control plane's module catalog (C3).
//!
//! Owns `ModuleMetadata` (name, version, checksum, distribution set).
//! Blob bytes are delegated to a `ModuleBlobStore` implementation so the
//! core never has to know whether artifacts live on local disk or in
//! object storage.

pub mod blob;
pub mod catalog;
pub mod error;

pub use blob::{FilesystemBlobStore, ModuleBlobStore};
pub use catalog::{DistributionReport, ModuleCatalog};
pub use error::{ModuleError, ModuleResult};
