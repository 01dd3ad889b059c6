//! JSON-RPC 2.0 envelope for task submission.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::message::Message;

/// Method name for blocking message submission.
pub const METHOD_MESSAGE_SEND: &str = "message/send";
/// Method name for streaming message submission.
pub const METHOD_MESSAGE_STREAM: &str = "message/stream";
/// Method name for fetching a stored task snapshot.
pub const METHOD_TASKS_GET: &str = "tasks/get";
/// Method name for requesting task cancellation.
pub const METHOD_TASKS_CANCEL: &str = "tasks/cancel";

/// Standard JSON-RPC error codes.
pub const ERROR_PARSE: i32 = -32700;
pub const ERROR_INVALID_REQUEST: i32 = -32600;
pub const ERROR_METHOD_NOT_FOUND: i32 = -32601;
pub const ERROR_INVALID_PARAMS: i32 = -32602;
pub const ERROR_INTERNAL: i32 = -32603;
/// Protocol-specific error codes.
pub const ERROR_TASK_NOT_FOUND: i32 = -32001;
pub const ERROR_UNSUPPORTED_OPERATION: i32 = -32004;

fn default_jsonrpc_version() -> String {
    "2.0".to_string()
}

/// JSON-RPC request identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
    Null,
}

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version, always `"2.0"`.
    #[serde(default = "default_jsonrpc_version")]
    pub jsonrpc: String,
    /// Method to invoke.
    pub method: String,
    /// Method parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    /// Client-assigned request identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
}

impl JsonRpcRequest {
    /// Request with a fresh string id.
    pub fn new(method: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: default_jsonrpc_version(),
            method: method.into(),
            params: Some(params),
            id: Some(RequestId::String(Uuid::new_v4().to_string())),
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric error code.
    pub code: i32,
    /// Short description of the error.
    pub message: String,
    /// Additional structured detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    pub fn parse_error(detail: impl Into<String>) -> Self {
        Self {
            code: ERROR_PARSE,
            message: detail.into(),
            data: None,
        }
    }

    pub fn invalid_request(detail: impl Into<String>) -> Self {
        Self {
            code: ERROR_INVALID_REQUEST,
            message: detail.into(),
            data: None,
        }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: ERROR_METHOD_NOT_FOUND,
            message: format!("Method not found: {method}"),
            data: None,
        }
    }

    pub fn invalid_params(detail: impl Into<String>) -> Self {
        Self {
            code: ERROR_INVALID_PARAMS,
            message: detail.into(),
            data: None,
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            code: ERROR_INTERNAL,
            message: detail.into(),
            data: None,
        }
    }

    pub fn task_not_found(task_id: &str) -> Self {
        Self {
            code: ERROR_TASK_NOT_FOUND,
            message: format!("Task not found: {task_id}"),
            data: None,
        }
    }

    pub fn unsupported_operation(method: &str) -> Self {
        Self {
            code: ERROR_UNSUPPORTED_OPERATION,
            message: format!("This operation is not supported: {method}"),
            data: None,
        }
    }
}

/// A JSON-RPC 2.0 response, success or error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version, always `"2.0"`.
    #[serde(default = "default_jsonrpc_version")]
    pub jsonrpc: String,
    /// Result payload, present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Error object, present on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    /// Identifier of the request this answers.
    pub id: Option<RequestId>,
}

impl JsonRpcResponse {
    /// Successful response carrying a result value.
    pub fn success(id: Option<RequestId>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: default_jsonrpc_version(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Error response.
    pub fn error(id: Option<RequestId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: default_jsonrpc_version(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

/// Parameters of `message/send` and `message/stream`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSendParams {
    /// The message being sent to the agent.
    pub message: Message,
}

/// Parameters of `tasks/get` and `tasks/cancel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskIdParams {
    /// The task being referenced.
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_accepts_string_and_number_ids() {
        let req: JsonRpcRequest = serde_json::from_str(
            r#"{"jsonrpc":"2.0","method":"tasks/get","params":{"id":"t-1"},"id":"req-1"}"#,
        )
        .unwrap();
        assert_eq!(req.id, Some(RequestId::String("req-1".to_string())));

        let req: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"tasks/get","id":7}"#).unwrap();
        assert_eq!(req.id, Some(RequestId::Number(7)));
        assert_eq!(req.method, "tasks/get");
    }

    #[test]
    fn success_response_shape() {
        let resp = JsonRpcResponse::success(
            Some(RequestId::Number(1)),
            serde_json::json!({"ok": true}),
        );
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["result"]["ok"], true);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn error_response_shape() {
        let resp = JsonRpcResponse::error(None, JsonRpcError::unsupported_operation("tasks/cancel"));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["error"]["code"], ERROR_UNSUPPORTED_OPERATION);
        assert!(json.get("result").is_none());
        assert!(json["id"].is_null());
    }

    #[test]
    fn error_codes_match_protocol() {
        assert_eq!(JsonRpcError::parse_error("x").code, -32700);
        assert_eq!(JsonRpcError::method_not_found("x").code, -32601);
        assert_eq!(JsonRpcError::task_not_found("t").code, -32001);
        assert_eq!(JsonRpcError::unsupported_operation("c").code, -32004);
    }
}
