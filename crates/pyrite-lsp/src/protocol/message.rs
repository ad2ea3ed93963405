//! JSON-RPC 2.0 message types

use super::error_codes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

const JSONRPC_VERSION: &str = "2.0";

/// Request ID - can be number or string
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(id) => write!(f, "{}", id),
            RequestId::String(id) => write!(f, "{:?}", id),
        }
    }
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        RequestId::Number(id)
    }
}

/// JSON-RPC 2.0 Request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl Request {
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC 2.0 Notification (no id, no response expected)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl Notification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    /// `null` when the request id could not be determined
    pub id: Option<RequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

impl Response {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<RequestId>, error: ResponseError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// JSON-RPC 2.0 Error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ResponseError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(error_codes::PARSE_ERROR, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(error_codes::INVALID_REQUEST, message)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(error_codes::METHOD_NOT_FOUND, format!("method not found: {}", method))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(error_codes::INVALID_PARAMS, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(error_codes::INTERNAL_ERROR, message)
    }

    pub fn server_not_initialized() -> Self {
        Self::new(error_codes::SERVER_NOT_INITIALIZED, "server not initialized")
    }
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ResponseError {}

/// Any message on the wire
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Message {
    Request(Request),
    Response(Response),
    Notification(Notification),
}

/// A frame that is not a usable JSON-RPC message, with the error to answer it
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidMessage {
    /// Id of the offending request, when one could be read
    pub id: Option<RequestId>,
    pub error: ResponseError,
}

impl InvalidMessage {
    pub fn into_response(self) -> Response {
        Response::error(self.id, self.error)
    }
}

impl Message {
    /// Parse a JSON body into a Message
    pub fn parse(json: &str) -> Result<Self, InvalidMessage> {
        let value: Value = serde_json::from_str(json).map_err(|e| InvalidMessage {
            id: None,
            error: ResponseError::parse_error(format!("invalid JSON: {}", e)),
        })?;

        let id = value
            .get("id")
            .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok());
        let invalid = |reason: String| InvalidMessage {
            id: id.clone(),
            error: ResponseError::invalid_request(reason),
        };

        if !value.is_object() {
            return Err(invalid("message must be a JSON object".to_string()));
        }
        if value.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Err(invalid("missing or unsupported jsonrpc version".to_string()));
        }

        let has_id = value.get("id").is_some();
        let has_method = value.get("method").is_some();
        let parsed = match (has_id, has_method) {
            (true, true) => serde_json::from_value(value).map(Message::Request),
            (true, false) => serde_json::from_value(value).map(Message::Response),
            (false, true) => serde_json::from_value(value).map(Message::Notification),
            (false, false) => return Err(invalid("message has neither id nor method".to_string())),
        };
        parsed.map_err(|e| invalid(e.to_string()))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<Response> for Message {
    fn from(response: Response) -> Self {
        Message::Response(response)
    }
}

impl From<Notification> for Message {
    fn from(notification: Notification) -> Self {
        Message::Notification(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn test_parse_request() {
        let message = Message::parse(r#"{"jsonrpc":"2.0","id":1,"method":"shutdown"}"#).unwrap();
        assert_eq!(message, Message::Request(Request::new(1, "shutdown", Value::Null)));
    }

    #[test]
    fn test_parse_notification_with_params() {
        let message =
            Message::parse(r#"{"jsonrpc":"2.0","method":"$/cancelRequest","params":{"id":"a"}}"#)
                .unwrap();
        let Message::Notification(notification) = message else {
            panic!("expected notification");
        };
        assert_eq!(notification.params, json!({"id": "a"}));
    }

    #[rstest]
    #[case("{not json", None, error_codes::PARSE_ERROR)]
    #[case("[1, 2]", None, error_codes::INVALID_REQUEST)]
    #[case(
        r#"{"jsonrpc":"1.0","id":3,"method":"x"}"#,
        Some(RequestId::Number(3)),
        error_codes::INVALID_REQUEST
    )]
    #[case(r#"{"jsonrpc":"2.0"}"#, None, error_codes::INVALID_REQUEST)]
    #[case(
        r#"{"jsonrpc":"2.0","id":"q","method":7}"#,
        Some(RequestId::String("q".into())),
        error_codes::INVALID_REQUEST
    )]
    fn test_invalid_messages(
        #[case] json: &str,
        #[case] id: Option<RequestId>,
        #[case] code: i32,
    ) {
        let invalid = Message::parse(json).unwrap_err();
        assert_eq!(invalid.id, id);
        assert_eq!(invalid.error.code, code);
    }

    #[test]
    fn test_success_with_null_result_keeps_result_field() {
        let response = Response::success(RequestId::Number(2), Value::Null);
        let json = Message::from(response).to_json().unwrap();
        assert_eq!(json, r#"{"jsonrpc":"2.0","id":2,"result":null}"#);
    }

    #[test]
    fn test_error_response_serialization() {
        let response = Response::error(None, ResponseError::parse_error("bad"));
        let value: Value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({"jsonrpc": "2.0", "id": null, "error": {"code": -32700, "message": "bad"}})
        );
    }
}
