use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

pub const MISSING_SYMPTOMS: &str = "Invalid input. \"symptoms\" key is required.";

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub symptoms: String,
    #[serde(default, deserialize_with = "integer_or_saturated")]
    pub top_k: Option<i64>,
}

/// Accept any JSON integer. Unsigned values past `i64::MAX` saturate rather
/// than fail, since they only ever mean "everything".
fn integer_or_saturated<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(number) = Option::<Number>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Some(n) = number.as_i64() {
        return Ok(Some(n));
    }
    if number.is_u64() {
        return Ok(Some(i64::MAX));
    }
    Err(D::Error::custom(format!(
        "invalid type: floating point `{number}`, expected an integer"
    )))
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// A failed request, rendered as `{"error": "..."}` with the given status.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl PredictRequest {
    /// Decode a raw request body. Anything that is not a JSON object with a
    /// `symptoms` key is a client error; so is a `top_k` that is not an integer.
    pub fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ApiError::bad_request(format!("request body is not valid JSON: {e}")))?;

        match value.as_object() {
            Some(obj) if obj.contains_key("symptoms") => {}
            _ => return Err(ApiError::bad_request(MISSING_SYMPTOMS)),
        }

        serde_json::from_value(value)
            .map_err(|e| ApiError::bad_request(format!("Invalid input. {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_symptoms_only() {
        let req = PredictRequest::from_body(br#"{"symptoms": "fever"}"#).unwrap();
        assert_eq!(req.symptoms, "fever");
        assert!(req.top_k.is_none());
    }

    #[test]
    fn parses_top_k() {
        let req = PredictRequest::from_body(br#"{"symptoms": "fever", "top_k": 3}"#).unwrap();
        assert_eq!(req.top_k, Some(3));
    }

    #[test]
    fn null_top_k_is_absent() {
        let req = PredictRequest::from_body(br#"{"symptoms": "x", "top_k": null}"#).unwrap();
        assert!(req.top_k.is_none());
    }

    #[test]
    fn negative_top_k_parses() {
        let req = PredictRequest::from_body(br#"{"symptoms": "x", "top_k": -2}"#).unwrap();
        assert_eq!(req.top_k, Some(-2));
    }

    #[test]
    fn top_k_beyond_i64_saturates() {
        let req =
            PredictRequest::from_body(br#"{"symptoms": "x", "top_k": 18446744073709551615}"#)
                .unwrap();
        assert_eq!(req.top_k, Some(i64::MAX));
        let req = PredictRequest::from_body(br#"{"symptoms": "x", "top_k": 9223372036854775808}"#)
            .unwrap();
        assert_eq!(req.top_k, Some(i64::MAX));
    }

    #[test]
    fn integral_float_top_k_is_rejected() {
        let err = PredictRequest::from_body(br#"{"symptoms": "x", "top_k": 3.0}"#).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_symptoms_is_rejected() {
        let err = PredictRequest::from_body(br#"{"top_k": 3}"#).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, MISSING_SYMPTOMS);
    }

    #[test]
    fn non_object_is_rejected() {
        let err = PredictRequest::from_body(br#"["fever"]"#).unwrap_err();
        assert_eq!(err.message, MISSING_SYMPTOMS);
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = PredictRequest::from_body(b"{symptoms: fever").unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("not valid JSON"));
    }

    #[test]
    fn empty_body_is_rejected() {
        assert!(PredictRequest::from_body(b"").is_err());
    }

    #[test]
    fn non_integer_top_k_is_rejected() {
        for body in [
            br#"{"symptoms": "x", "top_k": "5"}"#.as_slice(),
            br#"{"symptoms": "x", "top_k": 2.5}"#.as_slice(),
            br#"{"symptoms": "x", "top_k": true}"#.as_slice(),
        ] {
            let err = PredictRequest::from_body(body).unwrap_err();
            assert_eq!(err.status, StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn non_string_symptoms_is_rejected() {
        let err = PredictRequest::from_body(br#"{"symptoms": 42}"#).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn error_body_serializes() {
        let json = serde_json::to_value(ErrorBody {
            error: "boom".into(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"error": "boom"}));
    }
}
