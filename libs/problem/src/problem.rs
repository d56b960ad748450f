//! RFC 9457 Problem Details (pure data model, no HTTP framework dependencies)

use std::hash::{Hash, Hasher};

use http::StatusCode;
use serde_json::{Map, Value};

use crate::builder::ProblemBuilder;

/// Content type for Problem Details as per RFC 9457.
pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

/// Default problem type: the problem has no semantics beyond its status.
pub const ABOUT_BLANK: &str = "about:blank";

/// Member names owned by the problem itself. Extensions may not use them.
pub const RESERVED_FIELDS: [&str; 5] = ["type", "title", "status", "detail", "instance"];

/// Extension members, kept in insertion order.
pub type Extensions = Map<String, Value>;

/// RFC 9457 Problem Details for HTTP APIs.
///
/// A `Problem` is immutable once built. Construct one with
/// [`Problem::builder`]; derive a changed copy with [`Problem::to_builder`].
/// Equality and hashing are structural over every field. Extension order is
/// preserved for output but ignored when comparing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct Problem {
    type_url: String,
    title: String,
    status: Option<StatusCode>,
    detail: Option<String>,
    instance: Option<String>,
    extensions: Extensions,
}

impl Problem {
    /// Start building a problem. `title` is the only required member.
    pub fn builder() -> ProblemBuilder {
        ProblemBuilder::new()
    }

    /// A problem carrying nothing but a status: `about:blank` with the
    /// canonical reason phrase as its title.
    pub fn status_only(status: StatusCode) -> Self {
        Self {
            type_url: ABOUT_BLANK.to_owned(),
            title: status.canonical_reason().unwrap_or("Unknown Status").to_owned(),
            status: Some(status),
            detail: None,
            instance: None,
            extensions: Extensions::new(),
        }
    }

    /// Assemble a problem from fields the builder has already validated.
    pub(crate) fn from_validated(
        type_url: String,
        title: String,
        status: Option<StatusCode>,
        detail: Option<String>,
        instance: Option<String>,
        extensions: Extensions,
    ) -> Self {
        Self {
            type_url,
            title,
            status,
            detail,
            instance,
            extensions,
        }
    }

    /// Copy every member into a fresh builder.
    pub fn to_builder(&self) -> ProblemBuilder {
        ProblemBuilder::from_problem(self)
    }

    /// Same problem with `detail` replaced.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Same problem with `instance` replaced.
    pub fn with_instance(mut self, uri: impl Into<String>) -> Self {
        self.instance = Some(uri.into());
        self
    }

    #[must_use]
    pub fn type_url(&self) -> &str {
        &self.type_url
    }

    #[must_use]
    pub fn is_about_blank(&self) -> bool {
        self.type_url == ABOUT_BLANK
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    #[must_use]
    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    #[must_use]
    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.extensions.get(key)
    }
}

impl Hash for Problem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_url.hash(state);
        self.title.hash(state);
        self.status.hash(state);
        self.detail.hash(state);
        self.instance.hash(state);
        hash_object(&self.extensions, state);
    }
}

// Objects compare equal regardless of key order, so they hash in key order.
fn hash_object<H: Hasher>(map: &Map<String, Value>, state: &mut H) {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
    entries.len().hash(state);
    for (key, value) in entries {
        key.hash(state);
        hash_value(value, state);
    }
}

fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    std::mem::discriminant(value).hash(state);
    match value {
        Value::Null => {}
        Value::Bool(b) => b.hash(state),
        Value::Number(n) => n.hash(state),
        Value::String(s) => s.hash(state),
        Value::Array(items) => {
            items.len().hash(state);
            for item in items {
                hash_value(item, state);
            }
        }
        Value::Object(map) => hash_object(map, state),
    }
}

/// Axum integration: make Problem directly usable as a response
#[cfg(feature = "axum")]
impl axum::response::IntoResponse for Problem {
    fn into_response(self) -> axum::response::Response {
        use axum::http::HeaderValue;

        let status = self.status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut resp = axum::Json(crate::wire::to_wire(&self)).into_response();
        *resp.status_mut() = status;
        resp.headers_mut().insert(
            axum::http::header::CONTENT_TYPE,
            HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
        );
        resp
    }
}
