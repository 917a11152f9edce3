//! In-memory asset store kept in sync with the project directory.
//!
//! Templates are keyed by their normalized relative path; widget
//! definitions ("pagelets") live in a separate mapping keyed by logical name.

pub mod store;

pub use store::{AssetContent, AssetEntry, AssetStats, AssetStore};
