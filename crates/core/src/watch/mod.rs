//! Filesystem change pipeline.
//!
//! ```text
//!   notify events ──▶ filter (create / write / remove / move;
//!                         │  classified files, directories, vanished paths)
//!                         ▼
//!                   Debouncer (per path)
//!                         │ quiet for `window`, or `2 * window` into a burst
//!                         ▼
//!              AssetLoader::load / unload ──▶ AssetStore
//! ```

pub mod classify;
pub mod debounce;
pub mod pipeline;

pub use classify::{AssetKind, Classifier};
pub use debounce::Debouncer;
pub use pipeline::{LoadStats, WatchPipeline, WatchRoot};
