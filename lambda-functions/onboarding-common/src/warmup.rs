use lambda_http::{Request, RequestExt};
use serde_json::Value;

/// Scheduled keep-warm pings arrive either as `?source=warmup` or with a JSON
/// object body of `{"source": "warmup"}`.
pub fn is_warmup(request: &Request) -> bool {
    let from_query = request
        .query_string_parameters_ref()
        .and_then(|params| params.first("source"))
        == Some("warmup");

    from_query || body_is_warmup(request.body())
}

pub fn body_is_warmup(body: &[u8]) -> bool {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => map.get("source").and_then(Value::as_str) == Some("warmup"),
        _ => false,
    }
}
