//! Validation of provider replies.

use serde_json::Value;

use crate::error::{Result, ZvonokError};

/// Value of the top-level `status` field that marks a failed operation.
pub const ERROR_STATUS: &str = "error";

/// Turns a raw reply into the parsed body or an [`ZvonokError::Api`].
///
/// A reply fails when its HTTP status is 400 or above, when the body is not
/// a JSON object, or when its `status` field equals `"error"`.
pub fn check_response(url: &str, status: u16, body: &str) -> Result<Value> {
    if status >= 400 {
        return Err(ZvonokError::Api(format!(
            "Api method with url = {} responded with code = {}",
            url, status
        )));
    }

    let data = match serde_json::from_str::<Value>(body) {
        Ok(value @ Value::Object(_)) => value,
        _ => {
            return Err(ZvonokError::Api(
                "Failed to parse json from Zvonok api response".to_string(),
            ))
        }
    };

    if data.get("status").and_then(Value::as_str) == Some(ERROR_STATUS) {
        return Err(ZvonokError::Api(format!(
            "Zvonok api responded with error = {}",
            data
        )));
    }

    Ok(data)
}
