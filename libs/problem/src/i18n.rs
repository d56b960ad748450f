//! Message catalogs for localized problem titles and details.

use std::collections::HashMap;

use serde_json::{Map, Value};

/// Source of localized message templates.
pub trait MessageSource: Send + Sync {
    /// Template for `code` in `locale`, if the source has one.
    fn message(&self, code: &str, locale: &str) -> Option<String>;
}

/// In-memory catalog: `locale -> code -> template`.
///
/// Lookups fall back from a regional locale to its language (`de-CH` to
/// `de`), then to the default locale.
#[derive(Debug, Clone, Default)]
pub struct StaticMessageSource {
    messages: HashMap<String, HashMap<String, String>>,
    default_locale: Option<String>,
}

impl StaticMessageSource {
    #[must_use]
    pub fn new(messages: HashMap<String, HashMap<String, String>>) -> Self {
        Self {
            messages,
            default_locale: None,
        }
    }

    #[must_use]
    pub fn with_default_locale(mut self, locale: impl Into<String>) -> Self {
        self.default_locale = Some(locale.into());
        self
    }

    /// Add one message, replacing an existing template for the same code.
    #[must_use]
    pub fn with_message(
        mut self,
        locale: impl Into<String>,
        code: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        self.messages
            .entry(locale.into())
            .or_default()
            .insert(code.into(), template.into());
        self
    }

    fn exact(&self, code: &str, locale: &str) -> Option<&String> {
        self.messages.get(locale).and_then(|m| m.get(code))
    }
}

impl MessageSource for StaticMessageSource {
    fn message(&self, code: &str, locale: &str) -> Option<String> {
        let language = locale.split(['-', '_']).next().unwrap_or(locale);
        self.exact(code, locale)
            .or_else(|| self.exact(code, language))
            .or_else(|| {
                self.default_locale
                    .as_deref()
                    .and_then(|d| self.exact(code, d))
            })
            .cloned()
    }
}

/// Replace `{name}` placeholders with extension values.
///
/// Strings are inserted without quotes, other values as JSON. Unknown
/// placeholders are left untouched; `{{` and `}}` are literal braces.
#[must_use]
pub fn interpolate(template: &str, values: &Map<String, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") || tail.starts_with("}}") {
            out.push_str(&tail[..1]);
            rest = &tail[2..];
            continue;
        }

        if tail.starts_with('{')
            && let Some(end) = tail.find('}')
        {
            let name = &tail[1..end];
            match values.get(name) {
                Some(Value::String(s)) => out.push_str(s),
                Some(other) => out.push_str(&other.to_string()),
                None => out.push_str(&tail[..=end]),
            }
            rest = &tail[end + 1..];
            continue;
        }

        out.push_str(&tail[..1]);
        rest = &tail[1..];
    }

    out.push_str(rest);
    out
}
