//! JSON-RPC batch envelope
//!
//! Requests always go out as a one-element batch with a fixed id. Responses
//! come back as a one-element batch whose element carries either `result` or
//! `error`.

use serde::Serialize;
use serde_json::{Map, Value};

/// JSON-RPC protocol version sent with every call
pub const JSONRPC_VERSION: &str = "2.0";

/// Request id sent with every call; one call per request makes it constant
pub const REQUEST_ID: u64 = 1;

/// Prefix of every betting operation name
pub const METHOD_PREFIX: &str = "SportsAPING/v1.0/";

/// One element of the request batch
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    /// Protocol version
    pub jsonrpc: &'static str,
    /// Fully qualified method, e.g. `SportsAPING/v1.0/listEvents`
    pub method: String,
    /// Operation parameters
    pub params: Value,
    /// Request id
    pub id: u64,
}

impl RpcRequest {
    /// Build a request for `operation` (e.g. `listEvents`)
    pub fn new(operation: &str, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: format!("{METHOD_PREFIX}{operation}"),
            params,
            id: REQUEST_ID,
        }
    }

    /// Wrap into the one-element batch that goes on the wire
    pub fn into_batch(self) -> Value {
        Value::Array(vec![serde_json::to_value(self).unwrap_or(Value::Null)])
    }
}

/// What a response turned out to contain once unwrapped
#[derive(Debug, Clone, PartialEq)]
pub enum RpcOutcome {
    /// The `result` array
    Result(Vec<Value>),
    /// No `result` key; carries the `error` object if there was one
    Missing(Option<Value>),
    /// A `result` that is not an array
    Malformed(Value),
}

/// Unwrap a response body.
///
/// A one-element batch is unwrapped to its element and a bare object is used
/// as-is. Any other shape, or an object without `result`, is `Missing`; a
/// `result` that is present but not an array is `Malformed`.
pub fn unwrap_response(body: Value) -> RpcOutcome {
    let element = match body {
        Value::Array(mut items) if items.len() == 1 => items.remove(0),
        Value::Object(map) => Value::Object(map),
        _ => return RpcOutcome::Missing(None),
    };

    let Value::Object(mut map) = element else {
        return RpcOutcome::Missing(None);
    };

    match map.remove("result") {
        Some(Value::Array(items)) => RpcOutcome::Result(items),
        Some(other) => RpcOutcome::Malformed(other),
        None => RpcOutcome::Missing(map.remove("error")),
    }
}

/// Pull the code and message out of a JSON-RPC error object
pub fn describe_error(error: &Value) -> (Option<i64>, String) {
    let code = error.get("code").and_then(Value::as_i64);
    let message = error
        .get("data")
        .and_then(|d| d.get("APINGException"))
        .and_then(|e| e.get("errorCode"))
        .or_else(|| error.get("message"))
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| error.to_string());
    (code, message)
}

/// Build a params object holding the filter plus extra keys
pub fn params_with_filter(filter: Value, extra: Vec<(&'static str, Value)>) -> Value {
    let mut params = Map::new();
    params.insert("filter".to_string(), filter);
    for (key, value) in extra {
        params.insert(key.to_string(), value);
    }
    Value::Object(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_batch_shape() {
        let batch = RpcRequest::new("listEventTypes", json!({"filter": {}})).into_batch();
        assert_eq!(
            batch,
            json!([{
                "jsonrpc": "2.0",
                "method": "SportsAPING/v1.0/listEventTypes",
                "params": {"filter": {}},
                "id": 1
            }])
        );
    }

    #[test]
    fn test_unwrap_single_element_batch() {
        let outcome = unwrap_response(json!([{"jsonrpc": "2.0", "result": [{"a": 1}], "id": 1}]));
        assert_eq!(outcome, RpcOutcome::Result(vec![json!({"a": 1})]));
    }

    #[test]
    fn test_unwrap_bare_object() {
        assert_eq!(
            unwrap_response(json!({"result": []})),
            RpcOutcome::Result(vec![])
        );
    }

    #[test]
    fn test_unwrap_without_result() {
        assert_eq!(unwrap_response(json!([{"id": 1}])), RpcOutcome::Missing(None));
        assert_eq!(unwrap_response(json!([])), RpcOutcome::Missing(None));
        assert_eq!(
            unwrap_response(json!([{"result": []}, {"result": []}])),
            RpcOutcome::Missing(None)
        );
    }

    #[test]
    fn test_unwrap_non_array_result() {
        assert_eq!(
            unwrap_response(json!([{"result": null}])),
            RpcOutcome::Malformed(Value::Null)
        );
        assert_eq!(
            unwrap_response(json!([{"result": {"eventType": {"id": "1"}}}])),
            RpcOutcome::Malformed(json!({"eventType": {"id": "1"}}))
        );
    }

    #[test]
    fn test_unwrap_keeps_error_payload() {
        let outcome = unwrap_response(json!([{
            "error": {"code": -32099, "message": "ANGX-0003"},
            "id": 1
        }]));
        let RpcOutcome::Missing(Some(error)) = outcome else {
            panic!("expected a missing result with an error payload");
        };
        assert_eq!(describe_error(&error), (Some(-32099), "ANGX-0003".to_string()));
    }

    #[test]
    fn test_describe_error_prefers_aping_error_code() {
        let error = json!({
            "code": -32099,
            "message": "ANGX-0007",
            "data": {"APINGException": {"errorCode": "INVALID_SESSION_INFORMATION"}}
        });
        assert_eq!(
            describe_error(&error),
            (Some(-32099), "INVALID_SESSION_INFORMATION".to_string())
        );
    }

    #[test]
    fn test_params_with_filter() {
        let params = params_with_filter(json!({}), vec![("maxResults", json!(100))]);
        assert_eq!(params, json!({"filter": {}, "maxResults": 100}));
    }
}
