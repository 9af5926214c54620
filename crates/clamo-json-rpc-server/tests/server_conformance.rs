//! End-to-end request handling against a hand-written host.

use async_trait::async_trait;
use clamo_json_rpc_server::prelude::*;
use serde_json::{Value, json};

/// Host exposing a fixed set of echo operations, plus one it never lists.
struct ExampleService;

#[async_trait]
impl OperationHost for ExampleService {
    type Error = OperationError;

    fn list_operations(&self) -> Vec<String> {
        [
            "method_no_params_nil",
            "method_no_params_number",
            "method_no_params_string",
            "method_no_params_array",
            "method_no_params_object",
            "method_one_params_echo",
            "method_one_params_array_echo",
            "method_one_params_object_echo",
            "method_one_named_params_echo",
            "method_sum",
            "method_server_error",
        ]
        .iter()
        .map(|name| name.to_string())
        .collect()
    }

    fn describe(&self, name: &str) -> Option<ParameterShape> {
        let shape = match name {
            "method_no_params_nil"
            | "method_no_params_number"
            | "method_no_params_string"
            | "method_no_params_array"
            | "method_no_params_object"
            | "method_server_error"
            | "hidden_method" => ParameterShape::new(),
            "method_one_params_echo"
            | "method_one_params_array_echo"
            | "method_one_params_object_echo" => ParameterShape::new().required("arg"),
            "method_one_named_params_echo" => ParameterShape::new().optional_named("named"),
            "method_sum" => ParameterShape::new().variadic("values"),
            _ => return None,
        };
        Some(shape)
    }

    async fn invoke(&self, name: &str, args: BoundArguments) -> Result<Value, Self::Error> {
        let result = match name {
            "method_no_params_nil" => Value::Null,
            "method_no_params_number" => json!(42),
            "method_no_params_string" => json!("Hello world"),
            "method_no_params_array" => json!([]),
            "method_no_params_object" => json!({}),
            "method_one_params_echo" => args.arg::<Value>(0)?,
            "method_one_params_array_echo" => json!([args.arg::<Value>(0)?]),
            "method_one_params_object_echo" => json!({"value": args.arg::<Value>(0)?}),
            "method_one_named_params_echo" => args
                .opt_named_arg::<Value>("named")?
                .unwrap_or(Value::Null),
            "method_sum" => json!(args.rest_args::<i64>(0)?.iter().sum::<i64>()),
            "method_server_error" => {
                return Err(OperationError::server(-32001, "Resource busy"));
            }
            "hidden_method" => json!("This should not be exposed"),
            other => return Err(OperationError::failed(format!("no such operation {}", other))),
        };
        Ok(result)
    }
}

fn dispatcher() -> JsonRpcDispatcher<ExampleService> {
    JsonRpcDispatcher::builder(ExampleService)
        .notification_mode(NotificationMode::Inline)
        .build()
        .unwrap()
}

async fn with_request(request: Value) -> Option<Value> {
    dispatcher().handle_value(request).await
}

fn error_response(id: Value, code: i64, message: &str) -> Value {
    json!({"jsonrpc": "2.0", "error": {"code": code, "message": message}, "id": id})
}

fn result_response(id: Value, result: Value) -> Value {
    json!({"jsonrpc": "2.0", "result": result, "id": id})
}

#[tokio::test]
async fn test_parse_error() {
    let response = dispatcher().handle_str("{not json").await.unwrap();
    assert_eq!(
        serde_json::from_str::<Value>(&response).unwrap(),
        error_response(Value::Null, -32700, "Parse error")
    );
}

#[tokio::test]
async fn test_number_request() {
    assert_eq!(
        with_request(json!(1)).await,
        Some(error_response(Value::Null, -32600, "Invalid Request"))
    );
}

#[tokio::test]
async fn test_string_request() {
    assert_eq!(
        with_request(json!("")).await,
        Some(error_response(Value::Null, -32600, "Invalid Request"))
    );
}

#[tokio::test]
async fn test_blank_request_has_no_id_and_gets_no_response() {
    assert_eq!(with_request(json!({})).await, None);
}

#[tokio::test]
async fn test_unknown_method_request() {
    assert_eq!(
        with_request(json!({"jsonrpc": "2.0", "method": "unknown_method", "id": 1})).await,
        Some(error_response(json!(1), -32601, "Method not found"))
    );
}

#[tokio::test]
async fn test_unknown_method_notification() {
    assert_eq!(
        with_request(json!({"jsonrpc": "2.0", "method": "unknown_method"})).await,
        None
    );
}

#[tokio::test]
async fn test_unlisted_method_is_not_found() {
    assert_eq!(
        with_request(json!({"jsonrpc": "2.0", "method": "hidden_method", "id": 1})).await,
        Some(error_response(json!(1), -32601, "Method not found"))
    );
}

#[tokio::test]
async fn test_no_params_results() {
    let cases = [
        ("method_no_params_nil", Value::Null),
        ("method_no_params_number", json!(42)),
        ("method_no_params_string", json!("Hello world")),
        ("method_no_params_array", json!([])),
        ("method_no_params_object", json!({})),
    ];
    for (method, expected) in cases {
        assert_eq!(
            with_request(json!({"jsonrpc": "2.0", "method": method, "id": 1})).await,
            Some(result_response(json!(1), expected)),
            "{}",
            method
        );
    }
}

#[tokio::test]
async fn test_one_param_echo() {
    for arg in [Value::Null, json!(42), json!("hello"), json!([]), json!({}), json!({"e": "cho"})] {
        assert_eq!(
            with_request(json!({
                "jsonrpc": "2.0", "method": "method_one_params_echo", "params": [arg.clone()], "id": 1
            }))
            .await,
            Some(result_response(json!(1), arg))
        );
    }
}

#[tokio::test]
async fn test_one_param_wrapped_echo() {
    assert_eq!(
        with_request(json!({
            "jsonrpc": "2.0", "method": "method_one_params_array_echo", "params": [null], "id": 1
        }))
        .await,
        Some(result_response(json!(1), json!([null])))
    );
    assert_eq!(
        with_request(json!({
            "jsonrpc": "2.0", "method": "method_one_params_object_echo", "params": [{}], "id": 1
        }))
        .await,
        Some(result_response(json!(1), json!({"value": {}})))
    );
}

#[tokio::test]
async fn test_one_named_param() {
    assert_eq!(
        with_request(json!({
            "jsonrpc": "2.0", "method": "method_one_named_params_echo",
            "params": {"named": "value"}, "id": 1
        }))
        .await,
        Some(result_response(json!(1), json!("value")))
    );
    assert_eq!(
        with_request(json!({
            "jsonrpc": "2.0", "method": "method_one_named_params_echo", "id": 1
        }))
        .await,
        Some(result_response(json!(1), Value::Null))
    );
}

#[tokio::test]
async fn test_invalid_pragma() {
    assert_eq!(
        with_request(json!({
            "xmlrpc": "2.0", "method": "method_one_params_echo", "params": "invalid", "id": 1
        }))
        .await,
        Some(error_response(json!(1), -32600, "Invalid Request"))
    );
}

#[tokio::test]
async fn test_invalid_pragma_version() {
    assert_eq!(
        with_request(json!({
            "jsonrpc": "4.2", "method": "method_one_params_echo", "params": "invalid", "id": 1
        }))
        .await,
        Some(error_response(json!(1), -32600, "Invalid Request"))
    );
}

#[tokio::test]
async fn test_invalid_params_type() {
    for params in [json!("invalid"), json!(42)] {
        assert_eq!(
            with_request(json!({
                "jsonrpc": "2.0", "method": "method_one_params_echo", "params": params, "id": 1
            }))
            .await,
            Some(error_response(json!(1), -32602, "Invalid params"))
        );
    }
}

#[tokio::test]
async fn test_wrong_arity_reports_reason() {
    let response = with_request(json!({
        "jsonrpc": "2.0", "method": "method_one_params_echo", "params": [1, 2], "id": "a"
    }))
    .await
    .unwrap();
    assert_eq!(response["error"]["code"], json!(-32602));
    assert_eq!(
        response["error"]["data"],
        json!("expected 1 positional arguments, got 2")
    );
    assert_eq!(response["id"], json!("a"));
}

#[tokio::test]
async fn test_variadic_accepts_any_length() {
    for (params, expected) in [(json!([]), 0), (json!([1]), 1), (json!([1, 2, 3, 4]), 10)] {
        assert_eq!(
            with_request(json!({
                "jsonrpc": "2.0", "method": "method_sum", "params": params, "id": 1
            }))
            .await,
            Some(result_response(json!(1), json!(expected)))
        );
    }
}

#[tokio::test]
async fn test_server_band_error_passes_through() {
    assert_eq!(
        with_request(json!({"jsonrpc": "2.0", "method": "method_server_error", "id": 3})).await,
        Some(error_response(json!(3), -32001, "Resource busy"))
    );
}

#[tokio::test]
async fn test_id_forms() {
    // Null id is a call and is answered with a null id.
    assert_eq!(
        with_request(json!({"jsonrpc": "2.0", "method": "method_no_params_number", "id": null}))
            .await,
        Some(result_response(Value::Null, json!(42)))
    );
    // Integral float ids are echoed as given.
    assert_eq!(
        with_request(json!({"jsonrpc": "2.0", "method": "method_no_params_number", "id": 1.0}))
            .await,
        Some(result_response(json!(1.0), json!(42)))
    );
    for id in [json!(1.5), json!({}), json!([1]), json!(true)] {
        assert_eq!(
            with_request(json!({"jsonrpc": "2.0", "method": "method_no_params_number", "id": id}))
                .await,
            Some(error_response(Value::Null, -32600, "Invalid Request"))
        );
    }
}

#[tokio::test]
async fn test_batch() {
    let response = with_request(json!([
        {"jsonrpc": "2.0", "method": "method_sum", "params": [1, 2], "id": "1"},
        {"jsonrpc": "2.0", "method": "method_no_params_number"},
        1,
        {"jsonrpc": "2.0", "method": "unknown_method", "id": "5"},
        {"jsonrpc": "2.0", "method": "method_one_params_echo", "params": ["x"], "id": "9"}
    ]))
    .await;

    assert_eq!(
        response,
        Some(json!([
            result_response(json!("1"), json!(3)),
            error_response(Value::Null, -32600, "Invalid Request"),
            error_response(json!("5"), -32601, "Method not found"),
            result_response(json!("9"), json!("x"))
        ]))
    );
}

#[tokio::test]
async fn test_batch_of_invalid_members() {
    assert_eq!(
        with_request(json!([1, 2])).await,
        Some(json!([
            error_response(Value::Null, -32600, "Invalid Request"),
            error_response(Value::Null, -32600, "Invalid Request")
        ]))
    );
}

#[tokio::test]
async fn test_batch_of_notifications_gets_no_response() {
    assert_eq!(
        with_request(json!([
            {"jsonrpc": "2.0", "method": "method_no_params_nil"},
            {"jsonrpc": "2.0", "method": "unknown_method"}
        ]))
        .await,
        None
    );
    assert_eq!(with_request(json!([])).await, None);
}
