//! Exception resolver registry.
//!
//! Bindings are collected in a [`RegistryBuilder`] during application wiring
//! and then frozen into an immutable [`Registry`] that is shared freely
//! between request handlers.
//!
//! Lookup walks the declared ancestry of an exception type breadth-first and
//! returns the binding closest to the concrete type. When several supertypes
//! at the same distance are bound, the one registered first wins.
//!
//! Implementation details:
//! - Key = type name. [`ExceptionType`] names are the type identity.
//! - Lookups are memoised per exception type; the cache can never go stale
//!   because a frozen registry has no way to gain or lose bindings.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::context::ResolutionContext;
use crate::error::DuplicateBindingError;
use crate::exception::{Exception, ExceptionType, TypedException};
use crate::problem::Problem;

/// Translates one exception into a problem.
pub type Resolver =
    Arc<dyn Fn(&dyn Exception, &ResolutionContext) -> anyhow::Result<Problem> + Send + Sync>;

#[derive(Clone, Copy, Eq, PartialEq, Hash)]
struct TypeKey(&'static str);

impl TypeKey {
    #[inline]
    fn of(ty: &ExceptionType) -> Self {
        TypeKey(ty.name)
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// One exception type bound to its resolver.
pub struct ResolverBinding {
    exception_type: &'static ExceptionType,
    resolver: Resolver,
    order: usize,
}

impl ResolverBinding {
    #[must_use]
    pub fn exception_type(&self) -> &'static ExceptionType {
        self.exception_type
    }

    /// Position in registration order, starting at zero.
    #[must_use]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Run the resolver.
    ///
    /// # Errors
    /// Whatever the resolver returns. The engine turns such failures into a
    /// fallback problem.
    pub fn resolve(
        &self,
        exception: &dyn Exception,
        ctx: &ResolutionContext,
    ) -> anyhow::Result<Problem> {
        (self.resolver)(exception, ctx)
    }
}

impl fmt::Debug for ResolverBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverBinding")
            .field("exception_type", &self.exception_type)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

/// Mutable collection of bindings used during the wiring phase.
#[derive(Default)]
pub struct RegistryBuilder {
    bindings: HashMap<TypeKey, ResolverBinding>,
}

impl RegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `resolver` to `exception_type` and all of its subtypes that have
    /// no closer binding.
    ///
    /// # Errors
    /// Returns [`DuplicateBindingError`] if `exception_type` already has a
    /// binding. Bindings for its supertypes or subtypes are unaffected.
    pub fn register<F>(
        &mut self,
        exception_type: &'static ExceptionType,
        resolver: F,
    ) -> Result<&mut Self, DuplicateBindingError>
    where
        F: Fn(&dyn Exception, &ResolutionContext) -> anyhow::Result<Problem>
            + Send
            + Sync
            + 'static,
    {
        let key = TypeKey::of(exception_type);
        if self.bindings.contains_key(&key) {
            return Err(DuplicateBindingError {
                type_name: exception_type.name,
            });
        }

        let order = self.bindings.len();
        tracing::debug!(exception_type = exception_type.name, order, "registering problem resolver");
        self.bindings.insert(
            key,
            ResolverBinding {
                exception_type,
                resolver: Arc::new(resolver),
                order,
            },
        );
        Ok(self)
    }

    /// Bind a resolver that receives the concrete error type `E`.
    ///
    /// The binding covers subtypes of `E`'s tag as well. A subtype instance
    /// that is not an `E` value cannot be handed to the resolver; that case
    /// is reported as a resolver failure.
    ///
    /// # Errors
    /// Returns [`DuplicateBindingError`] if `E`'s type already has a binding.
    pub fn register_typed<E, F>(&mut self, resolver: F) -> Result<&mut Self, DuplicateBindingError>
    where
        E: TypedException,
        F: Fn(&E, &ResolutionContext) -> anyhow::Result<Problem> + Send + Sync + 'static,
    {
        let bound = E::static_type();
        self.register(bound, move |exception, ctx| {
            let typed = exception.downcast_ref::<E>().ok_or_else(|| {
                anyhow::anyhow!(
                    "resolver bound to '{}' cannot handle a '{}' value",
                    bound.name,
                    exception.exception_type().name
                )
            })?;
            resolver(typed, ctx)
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// End the wiring phase.
    #[must_use]
    pub fn freeze(self) -> Registry {
        tracing::info!(bindings = self.bindings.len(), "problem resolver registry frozen");
        Registry {
            inner: Arc::new(RegistryInner {
                bindings: self.bindings,
                cache: DashMap::new(),
            }),
        }
    }
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bindings: Vec<&ResolverBinding> = self.bindings.values().collect();
        bindings.sort_by_key(|b| b.order);
        f.debug_struct("RegistryBuilder")
            .field("bindings", &bindings)
            .finish()
    }
}

struct RegistryInner {
    bindings: HashMap<TypeKey, ResolverBinding>,
    cache: DashMap<TypeKey, Option<TypeKey>>,
}

/// Frozen, shareable set of resolver bindings. Cloning is cheap.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    /// A registry with no bindings: everything resolves to the fallback.
    #[must_use]
    pub fn empty() -> Self {
        RegistryBuilder::new().freeze()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.bindings.is_empty()
    }

    /// Whether `exception_type` itself has a binding.
    #[must_use]
    pub fn contains(&self, exception_type: &ExceptionType) -> bool {
        self.inner
            .bindings
            .contains_key(&TypeKey::of(exception_type))
    }

    /// Most specific binding for the runtime type of `exception`.
    #[must_use]
    pub fn lookup(&self, exception: &dyn Exception) -> Option<&ResolverBinding> {
        self.lookup_type(exception.exception_type())
    }

    /// Most specific binding for `exception_type` or any of its ancestors.
    #[must_use]
    pub fn lookup_type(&self, exception_type: &ExceptionType) -> Option<&ResolverBinding> {
        let key = TypeKey::of(exception_type);
        let cached = self.inner.cache.get(&key).map(|hit| *hit);
        let matched = match cached {
            Some(matched) => matched,
            None => {
                let matched = self.most_specific(exception_type);
                tracing::debug!(
                    exception_type = exception_type.name,
                    matched = ?matched,
                    "resolved problem resolver binding"
                );
                self.inner.cache.insert(key, matched);
                matched
            }
        };
        matched.and_then(|k| self.inner.bindings.get(&k))
    }

    fn most_specific(&self, exception_type: &ExceptionType) -> Option<TypeKey> {
        exception_type
            .ancestry()
            .into_iter()
            .filter_map(|(ty, depth)| {
                let key = TypeKey::of(ty);
                self.inner
                    .bindings
                    .get(&key)
                    .map(|binding| (depth, binding.order, key))
            })
            .min_by_key(|&(depth, order, _)| (depth, order))
            .map(|(_, _, key)| key)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bindings: Vec<&ResolverBinding> = self.inner.bindings.values().collect();
        bindings.sort_by_key(|b| b.order);
        f.debug_struct("Registry")
            .field("bindings", &bindings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use http::StatusCode;

    crate::exception_type!(static RUNTIME = "Runtime");
    crate::exception_type!(static RETRYABLE = "Retryable");
    crate::exception_type!(static IO = "Io": RUNTIME);
    crate::exception_type!(static TIMEOUT = "Timeout": IO, RETRYABLE);
    crate::exception_type!(static FLAKY = "Flaky": RETRYABLE, RUNTIME);

    #[derive(Debug, thiserror::Error)]
    #[error("io failure")]
    struct IoFailure;
    crate::exception!(IoFailure => IO);

    #[derive(Debug, thiserror::Error)]
    #[error("timed out after {0}ms")]
    struct TimedOut(u64);
    crate::exception!(TimedOut => TIMEOUT);

    fn titled(title: &'static str) -> impl Fn(&dyn Exception, &ResolutionContext) -> anyhow::Result<Problem> {
        move |_, _| Ok(Problem::builder().title(title).build()?)
    }

    fn resolved_title(registry: &Registry, ty: &ExceptionType) -> Option<String> {
        let binding = registry.lookup_type(ty)?;
        Some(
            binding
                .resolve(&IoFailure, &ResolutionContext::new())
                .unwrap()
                .title()
                .to_owned(),
        )
    }

    #[test]
    fn subtype_binding_beats_base_binding() {
        let mut builder = RegistryBuilder::new();
        builder
            .register(&RUNTIME, titled("runtime"))
            .unwrap()
            .register(&IO, titled("io"))
            .unwrap();
        let registry = builder.freeze();

        assert_eq!(resolved_title(&registry, &IO).as_deref(), Some("io"));
        assert_eq!(resolved_title(&registry, &TIMEOUT).as_deref(), Some("io"));
        assert_eq!(resolved_title(&registry, &RUNTIME).as_deref(), Some("runtime"));
    }

    #[test]
    fn exact_duplicate_is_rejected() {
        let mut builder = RegistryBuilder::new();
        builder.register(&IO, titled("first")).unwrap();
        let err = builder.register(&IO, titled("second")).unwrap_err();
        assert_eq!(err.type_name, "Io");
        assert_eq!(builder.len(), 1);

        let registry = builder.freeze();
        assert_eq!(resolved_title(&registry, &IO).as_deref(), Some("first"));
    }

    #[test]
    fn equal_depth_tie_goes_to_first_registered() {
        let mut builder = RegistryBuilder::new();
        builder
            .register(&RUNTIME, titled("runtime"))
            .unwrap()
            .register(&RETRYABLE, titled("retryable"))
            .unwrap();
        let registry = builder.freeze();

        // Flaky declares Retryable first, but Runtime was registered first.
        assert_eq!(resolved_title(&registry, &FLAKY).as_deref(), Some("runtime"));
    }

    #[test]
    fn closer_supertype_beats_earlier_registration() {
        let mut builder = RegistryBuilder::new();
        builder
            .register(&RUNTIME, titled("runtime"))
            .unwrap()
            .register(&RETRYABLE, titled("retryable"))
            .unwrap();
        let registry = builder.freeze();

        // Timeout -> Retryable is depth 1, Timeout -> Io -> Runtime is depth 2.
        assert_eq!(resolved_title(&registry, &TIMEOUT).as_deref(), Some("retryable"));
    }

    #[test]
    fn root_binding_catches_everything() {
        let mut builder = RegistryBuilder::new();
        builder.register(&ExceptionType::ROOT, titled("any")).unwrap();
        let registry = builder.freeze();

        assert_eq!(resolved_title(&registry, &TIMEOUT).as_deref(), Some("any"));
        assert_eq!(resolved_title(&registry, &RETRYABLE).as_deref(), Some("any"));
    }

    #[test]
    fn unmatched_type_yields_none() {
        let mut builder = RegistryBuilder::new();
        builder.register(&IO, titled("io")).unwrap();
        let registry = builder.freeze();

        assert!(registry.lookup_type(&RETRYABLE).is_none());
        // second lookup is served from the cache and agrees
        assert!(registry.lookup_type(&RETRYABLE).is_none());
        assert!(Registry::empty().lookup(&IoFailure).is_none());
    }

    #[test]
    fn typed_resolver_receives_concrete_value() {
        let mut builder = RegistryBuilder::new();
        builder
            .register_typed::<TimedOut, _>(|e, _| {
                Ok(Problem::builder()
                    .title("Timeout")
                    .status(StatusCode::GATEWAY_TIMEOUT)
                    .extension("elapsed_ms", e.0)
                    .build()?)
            })
            .unwrap();
        let registry = builder.freeze();

        let err = TimedOut(1500);
        let binding = registry.lookup(&err).unwrap();
        let problem = binding.resolve(&err, &ResolutionContext::new()).unwrap();
        assert_eq!(problem.extension("elapsed_ms"), Some(&serde_json::json!(1500)));
        assert!(registry.contains(&TIMEOUT));
    }

    #[test]
    fn typed_resolver_rejects_foreign_subtype_values() {
        let mut builder = RegistryBuilder::new();
        builder
            .register_typed::<IoFailure, _>(|_, _| Ok(Problem::builder().title("io").build()?))
            .unwrap();
        let registry = builder.freeze();

        let err = TimedOut(10);
        let binding = registry.lookup(&err).unwrap();
        let failure = binding
            .resolve(&err, &ResolutionContext::new())
            .unwrap_err();
        assert!(failure.to_string().contains("'Timeout'"));
    }

    #[test]
    fn frozen_registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Registry>();

        let mut builder = RegistryBuilder::new();
        builder.register(&IO, titled("io")).unwrap();
        let registry = builder.freeze();

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..100 {
                        assert_eq!(resolved_title(&registry, &TIMEOUT).as_deref(), Some("io"));
                    }
                });
            }
        });
    }
}
