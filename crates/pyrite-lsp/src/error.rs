//! Engine errors and their JSON-RPC mapping

use crate::document::DocumentError;
use crate::protocol::{error_codes, ResponseError};
use thiserror::Error;

/// Failure while handling one request
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("server not initialized")]
    NotInitialized,

    #[error("server is shutting down")]
    ShuttingDown,

    #[error("request cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// JSON-RPC error sent to the client; never includes a backtrace
    pub fn to_response_error(&self) -> ResponseError {
        let code = match self {
            EngineError::Document(_) | EngineError::InvalidParams(_) => error_codes::INVALID_PARAMS,
            EngineError::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            EngineError::NotInitialized => error_codes::SERVER_NOT_INITIALIZED,
            EngineError::ShuttingDown => error_codes::INVALID_REQUEST,
            EngineError::Cancelled => error_codes::REQUEST_CANCELLED,
            EngineError::Internal(_) => error_codes::INTERNAL_ERROR,
        };
        ResponseError::new(code, self.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(error: serde_json::Error) -> Self {
        EngineError::InvalidParams(error.to_string())
    }
}

impl From<pyrite_analyzer::Cancelled> for EngineError {
    fn from(_: pyrite_analyzer::Cancelled) -> Self {
        EngineError::Cancelled
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use lsp_types::Url;

    #[test]
    fn test_document_errors_are_invalid_params() {
        let uri = Url::parse("file:///missing.py").unwrap();
        let error = EngineError::from(DocumentError::UnknownDocument(uri));
        let response = error.to_response_error();
        assert_eq!(response.code, error_codes::INVALID_PARAMS);
        assert!(response.message.contains("UnknownDocument"));
    }

    #[test]
    fn test_codes() {
        assert_eq!(EngineError::NotInitialized.to_response_error().code, -32002);
        assert_eq!(EngineError::ShuttingDown.to_response_error().code, -32600);
        assert_eq!(
            EngineError::MethodNotFound("x".into()).to_response_error().code,
            -32601
        );
        assert_eq!(EngineError::Internal("boom".into()).to_response_error().code, -32603);
    }
}
