use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Uniform envelope for every backend and direct-upstream payload.
///
/// The request gateway guarantees callers always receive one of these:
/// network failures, timeouts and parse errors are folded into
/// `{ success: false, message }` instead of surfacing as errors. Extra
/// fields the backend attaches (timing counters etc.) are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiResponse {
    /// A successful payload wrapping already-serialized data.
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    /// The normalized failure shape. Never cached, safe to show to users.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }

    /// Decode the `data` field into a concrete model.
    ///
    /// A `success: false` payload becomes `CoreError::Backend` carrying the
    /// backend's own message, so view code can display it verbatim.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, CoreError> {
        if !self.success {
            return Err(CoreError::Backend(
                self.message
                    .clone()
                    .unwrap_or_else(|| "request failed".to_string()),
            ));
        }
        let data = self
            .data
            .clone()
            .ok_or_else(|| CoreError::Backend("response carried no data".to_string()))?;
        serde_json::from_value(data).map_err(|e| CoreError::Deserialization(e.to_string()))
    }
}
