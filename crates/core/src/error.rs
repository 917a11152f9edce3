use lynkui_api::{DataError, ServiceStatus};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LynkuiError {
    #[error("table ({0}) not found")]
    TableNotFound(String),
    #[error("ref-table of ({0}) not configured")]
    RefNotConfigured(String),
    #[error("instance ({0}) service not found")]
    BackendNotFound(String),
    #[error("invalid name: {0:?}")]
    InvalidName(String),
    #[error("service status {0}")]
    Status(ServiceStatus),
    #[error("data service error: {0}")]
    Data(#[from] DataError),
    #[error("decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("persist {path}: {source}")]
    PersistenceWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LynkuiError {
    /// Status reported to callers that expect a `DataResult` instead of an error.
    pub fn to_status(&self) -> ServiceStatus {
        use lynkui_api::StatusCode;
        match self {
            LynkuiError::Status(status) => status.clone(),
            LynkuiError::TableNotFound(_) | LynkuiError::BackendNotFound(_) => {
                ServiceStatus::new(StatusCode::NotFound, self.to_string())
            }
            LynkuiError::RefNotConfigured(_) | LynkuiError::InvalidName(_) => {
                ServiceStatus::new(StatusCode::BadRequest, self.to_string())
            }
            LynkuiError::Data(DataError::InvalidArgument(_)) => {
                ServiceStatus::new(StatusCode::BadRequest, self.to_string())
            }
            _ => ServiceStatus::new(StatusCode::InternalError, self.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, LynkuiError>;
