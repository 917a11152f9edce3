pub mod error;
pub mod logging;
pub mod util;

pub mod asset;
pub mod config;
pub mod facade;
pub mod layout;
pub mod loader;
pub mod object;
pub mod watch;

pub use config::ServiceConfig;
pub use error::{LynkuiError, Result};
pub use facade::{UiService, UiServiceBuilder};
