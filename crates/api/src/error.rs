#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("Table not found: {0}")]
    TableNotFound(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Connection failed: {0}")]
    Connect(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for DataError {
    fn from(err: std::io::Error) -> Self {
        DataError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::Storage(err.to_string())
    }
}

pub type ServiceResult<T> = std::result::Result<T, DataError>;
