//! Resolution engine: exception in, problem out.
//!
//! [`Engine::resolve`] is total. Whatever the registry and its resolvers do,
//! the caller gets a well-formed [`Problem`]:
//!
//! 1. a problem carried by the exception itself is used as-is;
//! 2. otherwise the most specific registered resolver runs;
//! 3. when nothing is registered for the exception, its causes are tried;
//! 4. anything left unresolved, failed or panicked becomes the fallback;
//! 5. customizers enrich the result.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::Arc;

use crate::config::ProblemConfig;
use crate::context::ResolutionContext;
use crate::customize::{InstanceCustomizer, MessageCustomizer, ProblemCustomizer, RequestIdCustomizer};
use crate::error::{ConfigError, ValidationError};
use crate::exception::Exception;
use crate::problem::Problem;
use crate::registry::{Registry, ResolverBinding};

/// Turns exceptions into problems. Share it behind an `Arc` or by reference.
pub struct Engine {
    registry: Registry,
    fallback: Problem,
    verbose_detail: bool,
    unwrap_causes: bool,
    max_cause_depth: usize,
    customizers: Vec<Arc<dyn ProblemCustomizer>>,
}

impl Engine {
    /// Build an engine and install the customizers enabled in `config`.
    ///
    /// # Errors
    /// Returns [`ValidationError`] if the configured fallback is not a valid
    /// problem.
    pub fn new(registry: Registry, config: &ProblemConfig) -> Result<Self, ValidationError> {
        let fallback = config.fallback.to_problem()?;

        let mut customizers: Vec<Arc<dyn ProblemCustomizer>> = Vec::new();
        if config.i18n.enabled {
            customizers.push(Arc::new(MessageCustomizer::from_config(&config.i18n)));
        }
        if config.fill_instance {
            customizers.push(Arc::new(InstanceCustomizer));
        }
        if config.request_id {
            customizers.push(Arc::new(RequestIdCustomizer));
        }

        tracing::debug!(
            bindings = registry.len(),
            customizers = customizers.len(),
            fallback_status = ?fallback.status(),
            "problem engine ready"
        );

        Ok(Self {
            registry,
            fallback,
            verbose_detail: config.fallback.verbose_detail,
            unwrap_causes: config.unwrap_causes,
            max_cause_depth: config.max_cause_depth,
            customizers,
        })
    }

    /// Load the configuration (see [`ProblemConfig::load`]) and build an
    /// engine from it.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if loading fails or the fallback is invalid.
    pub fn from_config(registry: Registry, path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = ProblemConfig::load(path)?;
        Ok(Self::new(registry, &config)?)
    }

    /// Append a customizer; it runs after the built-in ones.
    #[must_use]
    pub fn with_customizer(mut self, customizer: impl ProblemCustomizer + 'static) -> Self {
        self.customizers.push(Arc::new(customizer));
        self
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The fallback template, without any detail.
    #[must_use]
    pub fn fallback(&self) -> &Problem {
        &self.fallback
    }

    /// Translate `exception` into a problem. Never fails.
    #[must_use]
    pub fn resolve(&self, exception: &dyn Exception, ctx: &ResolutionContext) -> Problem {
        let resolved = catch_unwind(AssertUnwindSafe(|| {
            self.resolve_chain(exception, ctx)
                .unwrap_or_else(|| self.fallback_for(exception))
        }));
        let problem = resolved.unwrap_or_else(|payload| {
            // The exception's own methods panicked; don't touch it again.
            tracing::warn!(
                panic = panic_message(payload.as_ref()),
                "exception panicked during resolution, responding with fallback problem"
            );
            self.fallback.clone()
        });
        self.customize(problem, ctx)
    }

    fn resolve_chain(&self, exception: &dyn Exception, ctx: &ResolutionContext) -> Option<Problem> {
        let mut current = exception;
        let mut depth = 0;
        loop {
            if let Some(problem) = current.problem() {
                return Some(problem.clone());
            }
            if let Some(binding) = self.registry.lookup(current) {
                return invoke(binding, current, ctx);
            }
            if !self.unwrap_causes || depth >= self.max_cause_depth {
                return None;
            }
            current = current.cause_exception()?;
            depth += 1;
            tracing::debug!(
                exception_type = current.exception_type().name,
                depth,
                "no resolver bound, trying cause"
            );
        }
    }

    fn fallback_for(&self, exception: &dyn Exception) -> Problem {
        tracing::error!(
            exception_type = exception.exception_type().name,
            error = %exception,
            "unresolved exception, responding with fallback problem"
        );
        if self.verbose_detail {
            self.fallback.clone().with_detail(exception.to_string())
        } else {
            self.fallback.clone()
        }
    }

    fn customize(&self, mut problem: Problem, ctx: &ResolutionContext) -> Problem {
        for customizer in &self.customizers {
            let input = problem.clone();
            match catch_unwind(AssertUnwindSafe(|| customizer.customize(input, ctx))) {
                Ok(Ok(customized)) => problem = customized,
                Ok(Err(e)) => {
                    tracing::warn!(customizer = customizer.name(), error = %e, "problem customizer failed, skipping");
                }
                Err(payload) => {
                    tracing::warn!(
                        customizer = customizer.name(),
                        panic = panic_message(payload.as_ref()),
                        "problem customizer panicked, skipping"
                    );
                }
            }
        }
        problem
    }
}

fn invoke(binding: &ResolverBinding, exception: &dyn Exception, ctx: &ResolutionContext) -> Option<Problem> {
    let exception_type = binding.exception_type().name;
    match catch_unwind(AssertUnwindSafe(|| binding.resolve(exception, ctx))) {
        Ok(Ok(problem)) => Some(problem),
        Ok(Err(e)) => {
            tracing::warn!(exception_type, error = %e, "problem resolver failed");
            None
        }
        Err(payload) => {
            tracing::warn!(
                exception_type,
                panic = panic_message(payload.as_ref()),
                "problem resolver panicked"
            );
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry)
            .field("fallback", &self.fallback)
            .field("verbose_detail", &self.verbose_detail)
            .field("unwrap_causes", &self.unwrap_causes)
            .field("max_cause_depth", &self.max_cause_depth)
            .field(
                "customizers",
                &self.customizers.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
