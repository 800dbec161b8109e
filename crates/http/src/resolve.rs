//! Default interpretation of a successful exchange.
//!
//! A pure decision table, evaluated in strict order: explicit caller
//! intent first (`json`), content-kind sniffing as the default, the
//! suppression flags (`no_json`, `no_text`) as escape hatches. Decoding
//! failures propagate; malformed structured data is never coerced to
//! text.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Response;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tether_core::{Error, Result};

use crate::options::FetchOptions;

/// Media types recognized as structured data:
/// `application/<subtype>[+json]`, optionally with trailing parameters.
static JSON_MEDIA_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^application/[^+]*\+?json;?.*$").expect("media-type pattern is valid")
});

/// Whether `content_type` declares a structured-data body.
#[must_use]
pub fn is_json_media_type(content_type: &str) -> bool {
    JSON_MEDIA_TYPE.is_match(content_type)
}

/// Typed result of a resolved exchange.
///
/// The host framework treats this opaquely; [`deserialize`]
/// recovers a concrete type from the JSON branch.
///
/// [`deserialize`]: Payload::deserialize
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// Structured-decoded body.
    Json(Value),
    /// Raw text body.
    Text(String),
}

impl Payload {
    /// Borrow the structured body, when this is the JSON branch.
    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    /// Borrow the raw text, when this is the text branch.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Json(_) => None,
        }
    }

    /// Deserialize into a concrete type.
    ///
    /// The text branch is parsed as JSON first, so it only deserializes
    /// when the raw text happens to be valid JSON.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        match self {
            Self::Json(value) => serde_json::from_value(value.clone()).map_err(Error::decode),
            Self::Text(text) => serde_json::from_str(text).map_err(Error::decode),
        }
    }
}

/// Apply the decision table to a successful exchange.
pub(crate) async fn resolve_response(options: &FetchOptions, response: Response) -> Result<Payload> {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if options.json || (!options.no_json && is_json_media_type(content_type)) {
        let value = response.json::<Value>().await.map_err(Error::decode)?;
        return Ok(Payload::Json(value));
    }

    if !options.no_text {
        let text = response.text().await.map_err(Error::network)?;
        return Ok(Payload::Text(text));
    }

    Err(Error::Unprocessable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // -------------------------------
    // Media-type recognition
    // -------------------------------

    #[test]
    fn plain_json_media_type_matches() {
        assert!(is_json_media_type("application/json"));
        assert!(is_json_media_type("application/json; charset=utf-8"));
    }

    #[test]
    fn suffixed_json_media_types_match() {
        assert!(is_json_media_type("application/ld+json"));
        assert!(is_json_media_type("application/problem+json;charset=utf-8"));
    }

    #[test]
    fn non_json_media_types_do_not_match() {
        assert!(!is_json_media_type("text/plain"));
        assert!(!is_json_media_type("text/json"));
        assert!(!is_json_media_type("application/xml"));
        assert!(!is_json_media_type("application/octet-stream"));
    }

    // -------------------------------
    // Decision table over constructed responses
    // -------------------------------

    fn response(content_type: &str, body: &'static str) -> Response {
        let inner = http::Response::builder()
            .status(200)
            .header(http::header::CONTENT_TYPE, content_type)
            .body(body)
            .expect("valid test response");
        Response::from(inner)
    }

    #[tokio::test]
    async fn json_content_type_decodes_structured() {
        let payload = resolve_response(&FetchOptions::new(), response("application/json", r#"{"n":1}"#))
            .await
            .unwrap();
        assert_eq!(payload, Payload::Json(serde_json::json!({"n": 1})));
    }

    #[tokio::test]
    async fn text_content_type_decodes_raw_text() {
        let payload = resolve_response(&FetchOptions::new(), response("text/plain", "hello"))
            .await
            .unwrap();
        assert_eq!(payload, Payload::Text("hello".to_owned()));
    }

    #[tokio::test]
    async fn explicit_json_flag_overrides_content_type() {
        let payload = resolve_response(&FetchOptions::new().json(), response("text/plain", "[1,2]"))
            .await
            .unwrap();
        assert_eq!(payload, Payload::Json(serde_json::json!([1, 2])));
    }

    #[tokio::test]
    async fn no_json_falls_back_to_text() {
        let payload = resolve_response(
            &FetchOptions::new().no_json(),
            response("application/json", r#"{"n":1}"#),
        )
        .await
        .unwrap();
        assert_eq!(payload, Payload::Text(r#"{"n":1}"#.to_owned()));
    }

    #[tokio::test]
    async fn no_text_without_json_is_unprocessable() {
        let err = resolve_response(&FetchOptions::new().no_text(), response("text/plain", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unprocessable));
    }

    #[tokio::test]
    async fn malformed_json_fails_instead_of_coercing_to_text() {
        let err = resolve_response(
            &FetchOptions::new(),
            response("application/json", "{not json"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    // -------------------------------
    // Payload conveniences
    // -------------------------------

    #[test]
    fn deserialize_from_json_branch() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Item {
            n: u32,
        }
        let payload = Payload::Json(serde_json::json!({"n": 7}));
        assert_eq!(payload.deserialize::<Item>().unwrap(), Item { n: 7 });
    }

    #[test]
    fn accessors_distinguish_branches() {
        assert!(Payload::Json(Value::Null).as_json().is_some());
        assert!(Payload::Text(String::new()).as_text().is_some());
        assert!(Payload::Text(String::new()).as_json().is_none());
    }
}
