//! Validation of raw responses into JSON objects.

use crate::{response::ResponseMeta, FetchError, JsonObject, RawResponse, Result};
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A raw response that passed validation and decoded into `T`.
#[derive(Debug)]
pub(crate) struct Decoded<T> {
    pub data: T,
    pub body: Bytes,
    pub status: StatusCode,
    pub headers: HeaderMap,
}

/// Validates one attempt's output and decodes its payload.
///
/// Checks run in a fixed order: HTTP metadata, 2xx status, non-empty payload,
/// top-level JSON object, then conversion into `T`.
pub(crate) fn decode_response<T>(raw: RawResponse) -> Result<Decoded<T>>
where
    T: DeserializeOwned,
{
    let (status, headers) = match raw.meta {
        Some(ResponseMeta::Http { status, headers }) => (status, headers),
        Some(ResponseMeta::Other) | None => return Err(FetchError::InvalidResponse),
    };

    if !status.is_success() {
        let raw_response = raw
            .body
            .as_deref()
            .map(String::from_utf8_lossy)
            .unwrap_or_default()
            .into_owned();

        if status.is_client_error() {
            tracing::error!(
                status = status.as_u16(),
                response = %raw_response,
                "Client error (4xx)"
            );
        } else if status.is_server_error() {
            tracing::warn!(
                status = status.as_u16(),
                response = %raw_response,
                "Server error (5xx)"
            );
        }

        return Err(FetchError::BadStatusCode {
            status,
            headers,
            raw_response,
        });
    }

    let body = match raw.body {
        Some(body) if !body.is_empty() => body,
        _ => return Err(FetchError::BadData { status }),
    };

    let data = parse_object(&body).and_then(|object| {
        serde_json::from_value::<T>(Value::Object(object)).map_err(|e| e.to_string())
    });

    match data {
        Ok(data) => Ok(Decoded {
            data,
            body,
            status,
            headers,
        }),
        Err(serde_error) => {
            let raw_response = String::from_utf8_lossy(&body).into_owned();
            tracing::error!(
                error = %serde_error,
                raw_response = %raw_response,
                "Failed to decode response"
            );

            Err(FetchError::DecodeFailure {
                status,
                raw_response,
                serde_error,
            })
        }
    }
}

fn parse_object(body: &[u8]) -> std::result::Result<JsonObject, String> {
    match serde_json::from_slice::<Value>(body).map_err(|e| e.to_string())? {
        Value::Object(object) => Ok(object),
        other => Err(format!(
            "expected a JSON object at the top level, found {}",
            json_type_name(&other)
        )),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
