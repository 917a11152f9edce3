//! Virtual data layout: logical tables routed onto local services or remote
//! clients, backed by a persisted layout document.
//!
//! ```text
//!   query("lynk_dict")
//!        │
//!        ▼
//!   DataLayout ──(tables)──▶ (index, lynk_dict)
//!        │
//!        ├── local DataService   (errors and non-OK status are hard errors)
//!        └── remote DataClient   (status returned as data)
//!
//!   registration ──▶ LayoutStore::update ──▶ LayoutStore::flush
//! ```

pub mod router;
pub mod store;

pub use router::DataLayout;
pub use store::{LayoutDocument, LayoutStore};
