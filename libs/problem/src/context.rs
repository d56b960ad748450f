//! Per-occurrence data handed to resolvers and customizers.

use std::collections::BTreeMap;

/// Request-scoped inputs for resolving one error.
///
/// The framework adapter fills this in; the core never sources it itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct ResolutionContext {
    locale: Option<String>,
    instance: Option<String>,
    request_id: Option<String>,
    attributes: BTreeMap<String, String>,
}

impl ResolutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// BCP 47 language tag such as `de-CH`, used for message lookup.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// URI reference of the failed request, e.g. its path.
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    #[must_use]
    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}
