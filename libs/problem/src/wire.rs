//! Wire representation of a [`Problem`].
//!
//! A problem travels as a single JSON object. The reserved members `type`,
//! `title`, `status`, `detail` and `instance` are top-level keys and every
//! extension member is flattened next to them:
//!
//! ```json
//! {
//!   "type": "https://example.com/probs/out-of-credit",
//!   "title": "You do not have enough credit.",
//!   "status": 403,
//!   "detail": "Your current balance is 30, but that costs 50.",
//!   "balance": 30
//! }
//! ```
//!
//! `type` is always written (`about:blank` when defaulted). `status`,
//! `detail` and `instance` are omitted when absent. On input a missing
//! `type` reads as `about:blank`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::WireError;
use crate::problem::Problem;

/// JSON object form of a problem.
pub type Document = Map<String, Value>;

/// Render `problem` as a document.
#[must_use]
pub fn to_wire(problem: &Problem) -> Document {
    let mut doc = Document::new();
    doc.insert("type".to_owned(), Value::from(problem.type_url()));
    doc.insert("title".to_owned(), Value::from(problem.title()));
    if let Some(status) = problem.status() {
        doc.insert("status".to_owned(), Value::from(status.as_u16()));
    }
    if let Some(detail) = problem.detail() {
        doc.insert("detail".to_owned(), Value::from(detail));
    }
    if let Some(instance) = problem.instance() {
        doc.insert("instance".to_owned(), Value::from(instance));
    }
    for (key, value) in problem.extensions() {
        doc.insert(key.clone(), value.clone());
    }
    doc
}

/// Read a problem back from a document.
///
/// Every key that is not a reserved member becomes an extension.
///
/// # Errors
/// - [`WireError::InvalidField`] when a reserved member has the wrong JSON type
/// - [`WireError::Validation`] when the decoded members violate a problem
///   invariant (missing title, status out of range, relative type)
pub fn from_wire(doc: &Document) -> Result<Problem, WireError> {
    let mut builder = Problem::builder();

    if let Some(type_url) = optional_str(doc, "type")? {
        builder = builder.type_url(type_url);
    }
    if let Some(title) = optional_str(doc, "title")? {
        builder = builder.title(title);
    }
    if let Some(status) = doc.get("status").filter(|v| !v.is_null()) {
        let code = status
            .as_u64()
            .and_then(|n| u16::try_from(n).ok())
            .ok_or(WireError::InvalidField {
                field: "status",
                expected: "an integer status code",
            })?;
        builder = builder.status(code);
    }
    if let Some(detail) = optional_str(doc, "detail")? {
        builder = builder.detail(detail);
    }
    if let Some(instance) = optional_str(doc, "instance")? {
        builder = builder.instance(instance);
    }

    builder = builder.extensions(
        doc.iter()
            .filter(|(key, _)| !crate::problem::RESERVED_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone())),
    );

    Ok(builder.build()?)
}

/// Parse a JSON value that must be an object.
///
/// # Errors
/// [`WireError::NotAnObject`] for any other JSON value, otherwise as
/// [`from_wire`].
pub fn from_value(value: &Value) -> Result<Problem, WireError> {
    match value {
        Value::Object(doc) => from_wire(doc),
        _ => Err(WireError::NotAnObject),
    }
}

// `null` counts as absent so documents produced by other implementations
// that write explicit nulls still decode.
fn optional_str<'a>(doc: &'a Document, field: &'static str) -> Result<Option<&'a str>, WireError> {
    match doc.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(WireError::InvalidField {
            field,
            expected: "a string",
        }),
    }
}

impl Serialize for Problem {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        to_wire(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Problem {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let doc = Document::deserialize(deserializer)?;
        from_wire(&doc).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use http::StatusCode;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn minimal_problem_renders_type_title_status_only() {
        let p = Problem::builder()
            .type_url("https://example.org/not-found")
            .title("Not Found")
            .status(404u16)
            .build()
            .unwrap();

        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(
            json,
            r#"{"type":"https://example.org/not-found","title":"Not Found","status":404}"#
        );
    }

    #[test]
    fn extensions_are_flattened_in_order() {
        let p = Problem::builder()
            .title("Out of credit")
            .status(StatusCode::FORBIDDEN)
            .detail("Your current balance is 30, but that costs 50.")
            .instance("/account/12345/msgs/abc")
            .extension("balance", 30)
            .extension("accounts", json!(["/account/12345"]))
            .build()
            .unwrap();

        let wire = to_wire(&p);
        let keys: Vec<&str> = wire.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            ["type", "title", "status", "detail", "instance", "balance", "accounts"]
        );
        assert_eq!(wire["type"], json!("about:blank"));
        assert_eq!(wire["balance"], json!(30));
    }

    #[test]
    fn round_trips_through_document_and_text() {
        let p = Problem::builder()
            .type_url("https://example.com/probs/out-of-credit")
            .title("You do not have enough credit.")
            .status(403u16)
            .detail("Your current balance is 30, but that costs 50.")
            .instance("/account/12345/msgs/abc")
            .extension("balance", 30)
            .extension("limits", json!({"daily": 100, "nested": {"a": [1, 2.5, null]}}))
            .build()
            .unwrap();

        assert_eq!(from_wire(&to_wire(&p)).unwrap(), p);

        let text = serde_json::to_string(&p).unwrap();
        let back: Problem = serde_json::from_str(&text).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn missing_type_reads_as_about_blank() {
        let p = from_wire(&doc(json!({"title": "Teapot", "status": 418}))).unwrap();
        assert!(p.is_about_blank());
        assert_eq!(p.status(), Some(StatusCode::IM_A_TEAPOT));
    }

    #[test]
    fn explicit_nulls_are_treated_as_absent() {
        let p = from_wire(&doc(json!({
            "type": null,
            "title": "Gone",
            "status": null,
            "detail": null,
            "instance": null
        })))
        .unwrap();
        assert!(p.status().is_none());
        assert!(p.detail().is_none());
        assert!(p.extensions().is_empty());
    }

    #[test]
    fn wrongly_typed_reserved_members_are_rejected() {
        let err = from_wire(&doc(json!({"title": "x", "status": "404"}))).unwrap_err();
        assert_eq!(
            err,
            WireError::InvalidField {
                field: "status",
                expected: "an integer status code"
            }
        );

        let err = from_wire(&doc(json!({"title": 7}))).unwrap_err();
        assert!(matches!(err, WireError::InvalidField { field: "title", .. }));

        let err = from_wire(&doc(json!({"title": "x", "status": 70000}))).unwrap_err();
        assert!(matches!(err, WireError::InvalidField { field: "status", .. }));
    }

    #[test]
    fn invariant_violations_surface_as_validation_errors() {
        let err = from_wire(&doc(json!({"status": 500}))).unwrap_err();
        assert_eq!(err, WireError::Validation(ValidationError::MissingTitle));

        let err = from_wire(&doc(json!({"title": "x", "status": 999}))).unwrap_err();
        assert_eq!(err, WireError::Validation(ValidationError::InvalidStatus(999)));
    }

    #[test]
    fn non_object_values_are_rejected() {
        assert_eq!(from_value(&json!([1, 2])).unwrap_err(), WireError::NotAnObject);
        assert!(serde_json::from_str::<Problem>("\"oops\"").is_err());
    }
}
