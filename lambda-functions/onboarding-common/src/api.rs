//! API Gateway responses. Every response allows any origin so the workshop
//! web client can call the services directly.

use lambda_http::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use lambda_http::http::{HeaderValue, StatusCode};
use lambda_http::{Body, Response};
use serde::de::{DeserializeOwned, Error as _};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

pub fn empty(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::Empty);
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

pub fn json<T: Serialize>(status: StatusCode, body: &T) -> Response<Body> {
    match serde_json::to_string(body) {
        Ok(text) => text_body(status, text),
        Err(e) => {
            error!("Failed to serialize response body: {}", e);
            message(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

pub fn ok<T: Serialize>(body: &T) -> Response<Body> {
    json(StatusCode::OK, body)
}

/// `{"message": text}` with the given status.
pub fn message(status: StatusCode, text: &str) -> Response<Body> {
    text_body(status, json!({ "message": text }).to_string())
}

pub fn bad_request(text: &str) -> Response<Body> {
    message(StatusCode::BAD_REQUEST, text)
}

pub fn invalid_body() -> Response<Body> {
    bad_request("request body invalid")
}

/// Parses a request body that must be a JSON object. Arrays are rejected even
/// when they would fill the target struct positionally.
pub fn parse_object<T: DeserializeOwned>(body: &[u8]) -> serde_json::Result<T> {
    match serde_json::from_slice(body)? {
        value @ Value::Object(_) => serde_json::from_value(value),
        _ => Err(serde_json::Error::custom("expected a JSON object")),
    }
}

fn text_body(status: StatusCode, text: String) -> Response<Body> {
    let mut response = empty(status);
    *response.body_mut() = Body::Text(text);
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Debug, PartialEq)]
    struct Login {
        username: Option<String>,
        password: Option<String>,
    }

    #[test]
    fn test_parse_object_rejects_arrays() {
        let login: Login = parse_object(br#"{"username": "ada", "password": "pw"}"#).unwrap();
        assert_eq!(login.username.as_deref(), Some("ada"));

        assert!(parse_object::<Login>(br#"["ada", "pw"]"#).is_err());
        assert!(parse_object::<Login>(b"\"ada\"").is_err());
        assert!(parse_object::<Login>(b"").is_err());
    }

    fn body_text(response: &Response<Body>) -> String {
        String::from_utf8(response.body().to_vec()).unwrap()
    }

    #[test]
    fn test_empty_response_has_cors() {
        let response = empty(StatusCode::OK);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(response.headers().get(CONTENT_TYPE).is_none());
        assert!(body_text(&response).is_empty());
    }

    #[test]
    fn test_message_response() {
        let response = bad_request("request body invalid");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(body_text(&response), r#"{"message":"request body invalid"}"#);
    }

    #[test]
    fn test_ok_serializes_body() {
        let response = ok(&json!({"TenantId": "abc", "StackName": "Tenant-abc"}));
        let body: serde_json::Value = serde_json::from_str(&body_text(&response)).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body["StackName"], "Tenant-abc");
    }
}
