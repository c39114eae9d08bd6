/// Error types for the blog client
use thiserror::Error;
use tonic::Status;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Server unavailable: {0}")]
    Unavailable(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Convert gRPC Status to ClientError
impl From<Status> for ClientError {
    fn from(status: Status) -> Self {
        let msg = status.message().to_string();

        match status.code() {
            tonic::Code::NotFound => ClientError::NotFound(msg),
            tonic::Code::InvalidArgument => ClientError::InvalidArgument(msg),
            tonic::Code::Unavailable => ClientError::Unavailable(msg),
            tonic::Code::DeadlineExceeded => ClientError::Timeout(msg),
            tonic::Code::Internal => ClientError::InternalError(msg),
            _ => ClientError::Unknown(msg),
        }
    }
}
