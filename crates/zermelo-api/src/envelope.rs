//! Typed decoding of the `{ "response": { status, message, data } }` envelope.
//!
//! Raw bodies are decoded once here. The status is checked before the data is
//! touched, so a failed call never reaches the data decoder.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::ZermeloError;

#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    pub response: Envelope,
}

#[derive(Debug, Deserialize)]
pub struct Envelope {
    /// Status code, normalized to text (the API sends numbers, older
    /// deployments sent strings)
    #[serde(deserialize_with = "status_text")]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StatusRepr {
    Code(i64),
    Text(String),
}

fn status_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match StatusRepr::deserialize(deserializer)? {
        StatusRepr::Code(code) => code.to_string(),
        StatusRepr::Text(text) => text.trim().to_string(),
    })
}

impl Envelope {
    /// Check the status and hand out the payload.
    ///
    /// `200` passes the data through, `401` is [`ZermeloError::Unauthorized`]
    /// and anything else is [`ZermeloError::ApiError`] carrying the message.
    pub fn check(self) -> Result<Option<Value>, ZermeloError> {
        match self.status.as_str() {
            "200" => Ok(self.data),
            "401" => Err(ZermeloError::Unauthorized),
            status => {
                let message = self
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| format!("status {}", status));
                Err(ZermeloError::ApiError(message))
            }
        }
    }

    /// Check the status, then decode the payload. Absent data decodes as `T::default()`.
    pub fn into_data<T: DeserializeOwned + Default>(self) -> Result<T, ZermeloError> {
        match self.check()? {
            None | Some(Value::Null) => Ok(T::default()),
            Some(data) => serde_json::from_value(data)
                .map_err(|e| ZermeloError::InvalidResponse(format!("unexpected data: {}", e))),
        }
    }
}

/// Decode a raw enveloped body into `T`.
pub fn decode<T: DeserializeOwned + Default>(raw: &str) -> Result<T, ZermeloError> {
    let parsed: ApiResponse = serde_json::from_str(raw)
        .map_err(|e| ZermeloError::InvalidResponse(format!("JSON parse error: {}", e)))?;
    parsed.response.into_data()
}
