// handlers/protected/utils.rs - extraction and validation shared by resource handlers

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::header::ALLOW,
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::auth::UserId;
use crate::error::ApiError;
use crate::middleware::ApiResponse;

/// `Json<T>` whose rejections use the API error body (422)
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::unprocessable(rejection.body_text())),
        }
    }
}

/// Numeric path identifier; anything else is a 400
pub fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::bad_request(format!("Invalid identifier '{}'", raw)))
}

pub fn location(collection: &str, id: i64) -> String {
    format!("/{}/{}", collection, id)
}

/// Body of every OPTIONS answer
pub fn options_response(methods: &str) -> ApiResponse<Value> {
    ApiResponse::success(json!({ "message": "Request with options has been processed" }))
        .header(ALLOW, methods)
}

/// Collects per-field messages; `finish` turns any of them into a 422
#[derive(Debug, Default)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: &str) {
        self.0.entry(field.to_string()).or_insert_with(|| message.to_string());
    }

    /// Trimmed value, or a "Required" error when missing or blank
    pub fn required(&mut self, field: &str, value: Option<&str>, message: &str) -> String {
        let value = value.map(str::trim).unwrap_or_default();
        if value.is_empty() {
            self.add(field, message);
        }
        value.to_string()
    }

    pub fn email(&mut self, field: &str, value: Option<&str>) -> String {
        let value = self.required(field, value, "Required Email");
        if !value.is_empty() && !is_email(&value) {
            self.add(field, "Invalid Email");
        }
        value
    }

    pub fn author(&mut self, value: Option<i64>) -> UserId {
        match value {
            Some(id) if id > 0 => UserId(id),
            _ => {
                self.add("author_id", "Required Author");
                UserId::ANONYMOUS
            }
        }
    }

    pub fn reference(&mut self, field: &str, value: Option<i64>, message: &str) -> i64 {
        match value {
            Some(id) if id > 0 => id,
            _ => {
                self.add(field, message);
                0
            }
        }
    }

    pub fn data(&mut self, value: Option<Value>) -> Value {
        match value {
            None | Some(Value::Null) => {
                self.add("data", "Required Data");
                Value::Null
            }
            Some(Value::String(s)) if s.trim().is_empty() => {
                self.add("data", "Required Data");
                Value::Null
            }
            Some(v) => v,
        }
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.0.is_empty() {
            return Ok(());
        }
        Err(ApiError::validation(self.0))
    }
}

/// One '@', a non-empty local part and a dotted domain
fn is_email(value: &str) -> bool {
    let mut parts = value.splitn(2, '@');
    let (Some(local), Some(domain)) = (parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.contains(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|label| !label.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_must_be_positive_integers() {
        assert_eq!(parse_id("17").unwrap(), 17);
        assert!(parse_id("0").is_err());
        assert!(parse_id("-3").is_err());
        assert!(parse_id("abc").is_err());
    }

    #[test]
    fn email_shapes() {
        assert!(is_email("reader@doka.guide"));
        assert!(!is_email("reader"));
        assert!(!is_email("reader@localhost"));
        assert!(!is_email("a@b@c.d"));
        assert!(!is_email("re ader@doka.guide"));
        assert!(!is_email("@doka.guide"));
    }

    #[test]
    fn collects_first_message_per_field() {
        let mut errors = FieldErrors::new();
        let nickname = errors.required("nickname", Some("  anna "), "Required Nickname");
        assert_eq!(nickname, "anna");
        errors.email("email", Some("nope"));
        errors.author(None);
        errors.data(Some(Value::String("   ".into())));

        let err = errors.finish().unwrap_err();
        let body = err.to_json();
        assert_eq!(body["field_errors"]["email"], "Invalid Email");
        assert_eq!(body["field_errors"]["author_id"], "Required Author");
        assert_eq!(body["field_errors"]["data"], "Required Data");
        assert!(body["field_errors"].get("nickname").is_none());
    }
}
