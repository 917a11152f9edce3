pub mod error;
pub mod models;
pub mod service;

// Re-export commonly used types
pub use error::{DataError, ServiceResult};
pub use models::*;
pub use service::{ClientConnector, DataClient, DataService};
