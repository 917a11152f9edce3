pub mod data;
pub mod instance;
pub mod naming;
pub mod pagelet;
pub mod project;

pub use data::*;
pub use instance::*;
pub use naming::{is_valid_name, is_valid_namespace};
pub use pagelet::*;
pub use project::Project;
