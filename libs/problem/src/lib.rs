//! RFC 9457 problem details for application errors.
//!
//! This crate turns errors into [`Problem`] documents:
//! - [`Problem`] and [`ProblemBuilder`]: the validated value type
//! - [`RegistryBuilder`] and [`Registry`]: resolvers bound to exception types,
//!   matched against the most specific declared supertype
//! - [`Engine`]: total resolution with a configurable fallback and
//!   customizers
//! - [`wire`]: the JSON object contract with flattened extensions
//!
//! HTTP integration is limited to the optional `axum` feature, which renders
//! a problem as an `application/problem+json` response.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod builder;
pub mod catalog;
pub mod config;
pub mod context;
pub mod customize;
pub mod engine;
pub mod error;
pub mod exception;
pub mod i18n;
pub mod problem;
pub mod registry;
pub mod wire;

pub use builder::ProblemBuilder;
pub use catalog::ProblemDef;
pub use config::{FallbackConfig, I18nConfig, ProblemConfig};
pub use context::ResolutionContext;
pub use customize::{InstanceCustomizer, MessageCustomizer, ProblemCustomizer, RequestIdCustomizer};
pub use engine::Engine;
pub use error::{ConfigError, DuplicateBindingError, ValidationError, WireError};
pub use exception::{Exception, ExceptionType, ProblemError, TypedException};
pub use i18n::{MessageSource, StaticMessageSource};
pub use problem::{ABOUT_BLANK, APPLICATION_PROBLEM_JSON, Problem};
pub use registry::{Registry, RegistryBuilder, Resolver, ResolverBinding};
pub use wire::{Document, from_wire, to_wire};
