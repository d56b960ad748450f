//! Staged construction of [`Problem`] values.

use http::StatusCode;
use serde_json::Value;

use crate::error::ValidationError;
use crate::problem::{ABOUT_BLANK, Extensions, Problem, RESERVED_FIELDS};

/// Accumulates problem members and validates them once, in [`build`].
///
/// Setters consume and return the builder, so an unfinished problem never
/// escapes the expression that builds it.
///
/// [`build`]: ProblemBuilder::build
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct ProblemBuilder {
    type_url: Option<String>,
    title: Option<String>,
    status: Option<u16>,
    detail: Option<String>,
    instance: Option<String>,
    extensions: Extensions,
}

impl ProblemBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_problem(problem: &Problem) -> Self {
        Self {
            type_url: Some(problem.type_url().to_owned()),
            title: Some(problem.title().to_owned()),
            status: problem.status().map(|s| s.as_u16()),
            detail: problem.detail().map(ToOwned::to_owned),
            instance: problem.instance().map(ToOwned::to_owned),
            extensions: problem.extensions().clone(),
        }
    }

    /// Problem type URI. Defaults to `about:blank`.
    pub fn type_url(mut self, type_url: impl Into<String>) -> Self {
        self.type_url = Some(type_url.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Accepts a raw `u16` or an [`http::StatusCode`].
    pub fn status(mut self, status: impl Into<u16>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Add or replace one extension member.
    pub fn extension(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }

    /// Add or replace several extension members, keeping their order.
    pub fn extensions(mut self, extensions: impl IntoIterator<Item = (String, Value)>) -> Self {
        self.extensions.extend(extensions);
        self
    }

    /// Drop a previously set detail.
    pub fn clear_detail(mut self) -> Self {
        self.detail = None;
        self
    }

    /// Validate the accumulated members and produce the problem.
    ///
    /// # Errors
    /// - [`ValidationError::MissingTitle`] when no title (or a blank one) was set
    /// - [`ValidationError::InvalidStatus`] when the status is outside `100..=599`
    /// - [`ValidationError::InvalidType`] when the type is not an absolute URI
    /// - [`ValidationError::ReservedExtensionKey`] when an extension shadows a
    ///   reserved member
    pub fn build(self) -> Result<Problem, ValidationError> {
        let title = self
            .title
            .filter(|t| !t.trim().is_empty())
            .ok_or(ValidationError::MissingTitle)?;

        let status = self.status.map(validate_status).transpose()?;

        let type_url = match self.type_url {
            Some(t) => validate_type(t)?,
            None => ABOUT_BLANK.to_owned(),
        };

        if let Some(key) = self
            .extensions
            .keys()
            .find(|k| RESERVED_FIELDS.contains(&k.as_str()))
        {
            return Err(ValidationError::ReservedExtensionKey(key.clone()));
        }

        Ok(Problem::from_validated(
            type_url,
            title,
            status,
            self.detail,
            self.instance,
            self.extensions,
        ))
    }
}

fn validate_status(code: u16) -> Result<StatusCode, ValidationError> {
    if !(100..=599).contains(&code) {
        return Err(ValidationError::InvalidStatus(code));
    }
    StatusCode::from_u16(code).map_err(|_| ValidationError::InvalidStatus(code))
}

// `Url::parse` only accepts absolute URIs; `about:blank` is one of them.
fn validate_type(type_url: String) -> Result<String, ValidationError> {
    match url::Url::parse(&type_url) {
        Ok(_) => Ok(type_url),
        Err(e) => Err(ValidationError::InvalidType {
            value: type_url,
            reason: e.to_string(),
        }),
    }
}
