//! Post-resolution enrichment of problems.
//!
//! Customizers run after a problem was resolved (or fell back), in the order
//! they were installed on the engine. A customizer that fails is skipped and
//! the problem it was given is kept.

use std::sync::Arc;

use crate::config::I18nConfig;
use crate::context::ResolutionContext;
use crate::i18n::{MessageSource, StaticMessageSource, interpolate};
use crate::problem::{ABOUT_BLANK, Problem};

/// Extension key written by [`RequestIdCustomizer`].
pub const REQUEST_ID_EXTENSION: &str = "request_id";

/// One enrichment step.
pub trait ProblemCustomizer: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Return the enriched problem.
    ///
    /// # Errors
    /// Any error makes the engine skip this step for the current problem.
    fn customize(&self, problem: Problem, ctx: &ResolutionContext) -> anyhow::Result<Problem>;
}

impl<F> ProblemCustomizer for F
where
    F: Fn(Problem, &ResolutionContext) -> anyhow::Result<Problem> + Send + Sync,
{
    fn customize(&self, problem: Problem, ctx: &ResolutionContext) -> anyhow::Result<Problem> {
        self(problem, ctx)
    }
}

/// Copies the request instance into problems that have none.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstanceCustomizer;

impl ProblemCustomizer for InstanceCustomizer {
    fn name(&self) -> &str {
        "instance"
    }

    fn customize(&self, problem: Problem, ctx: &ResolutionContext) -> anyhow::Result<Problem> {
        Ok(match (problem.instance(), ctx.instance()) {
            (None, Some(instance)) => problem.with_instance(instance),
            _ => problem,
        })
    }
}

/// Adds the request id as a `request_id` extension unless one is present.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdCustomizer;

impl ProblemCustomizer for RequestIdCustomizer {
    fn name(&self) -> &str {
        "request_id"
    }

    fn customize(&self, problem: Problem, ctx: &ResolutionContext) -> anyhow::Result<Problem> {
        let Some(request_id) = ctx.request_id() else {
            return Ok(problem);
        };
        if problem.extension(REQUEST_ID_EXTENSION).is_some() {
            return Ok(problem);
        }
        Ok(problem
            .to_builder()
            .extension(REQUEST_ID_EXTENSION, request_id)
            .build()?)
    }
}

/// Localizes titles and fills in missing details from a [`MessageSource`].
///
/// The title code is `<prefix><separator><type>`. An `about:blank` problem
/// has no type of its own, so it is keyed by status instead:
/// `<prefix><separator>about:blank<separator><status>`, and left alone when
/// it has no status. The detail code appends `.detail`. Templates may
/// reference extension members as `{name}`.
pub struct MessageCustomizer {
    source: Arc<dyn MessageSource>,
    code_prefix: String,
    separator: String,
    default_locale: Option<String>,
}

impl MessageCustomizer {
    pub fn new(source: Arc<dyn MessageSource>) -> Self {
        let defaults = I18nConfig::default();
        Self {
            source,
            code_prefix: defaults.code_prefix,
            separator: defaults.separator,
            default_locale: None,
        }
    }

    /// Customizer backed by the messages listed in the configuration.
    pub fn from_config(config: &I18nConfig) -> Self {
        let mut source = StaticMessageSource::new(config.messages.clone());
        if let Some(locale) = &config.default_locale {
            source = source.with_default_locale(locale.as_str());
        }
        Self {
            source: Arc::new(source),
            code_prefix: config.code_prefix.clone(),
            separator: config.separator.clone(),
            default_locale: config.default_locale.clone(),
        }
    }

    #[must_use]
    pub fn with_code_prefix(mut self, prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        self.code_prefix = prefix.into();
        self.separator = separator.into();
        self
    }

    #[must_use]
    pub fn with_default_locale(mut self, locale: impl Into<String>) -> Self {
        self.default_locale = Some(locale.into());
        self
    }

    /// Message code for the title of `problem`, if it can have one.
    #[must_use]
    pub fn title_code(&self, problem: &Problem) -> Option<String> {
        let (prefix, sep) = (&self.code_prefix, &self.separator);
        if problem.is_about_blank() {
            problem
                .status()
                .map(|status| format!("{prefix}{sep}{ABOUT_BLANK}{sep}{}", status.as_u16()))
        } else {
            Some(format!("{prefix}{sep}{}", problem.type_url()))
        }
    }
}

impl ProblemCustomizer for MessageCustomizer {
    fn name(&self) -> &str {
        "i18n"
    }

    fn customize(&self, problem: Problem, ctx: &ResolutionContext) -> anyhow::Result<Problem> {
        let Some(locale) = ctx.locale().or(self.default_locale.as_deref()) else {
            return Ok(problem);
        };

        let Some(title_code) = self.title_code(&problem) else {
            return Ok(problem);
        };
        let title = self
            .source
            .message(&title_code, locale)
            .map(|t| interpolate(&t, problem.extensions()));
        let detail = if problem.detail().is_none() {
            self.source
                .message(&format!("{title_code}.detail"), locale)
                .map(|t| interpolate(&t, problem.extensions()))
        } else {
            None
        };

        if title.is_none() && detail.is_none() {
            return Ok(problem);
        }

        let mut builder = problem.to_builder();
        if let Some(title) = title {
            builder = builder.title(title);
        }
        if let Some(detail) = detail {
            builder = builder.detail(detail);
        }
        Ok(builder.build()?)
    }
}

impl std::fmt::Debug for MessageCustomizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageCustomizer")
            .field("code_prefix", &self.code_prefix)
            .field("separator", &self.separator)
            .field("default_locale", &self.default_locale)
            .finish_non_exhaustive()
    }
}
