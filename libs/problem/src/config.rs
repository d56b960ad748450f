//! Engine configuration.
//!
//! Loaded with figment from, in increasing precedence:
//! 1. built-in defaults
//! 2. an optional YAML file
//! 3. `PROBLEM_`-prefixed environment variables, `__` separating nested keys
//!    (`PROBLEM_FALLBACK__VERBOSE_DETAIL=true`)

use std::collections::HashMap;
use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ValidationError};
use crate::problem::Problem;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "PROBLEM_";

// Top-level sections read from the environment. Other `PROBLEM_*` variables
// belong to someone else and are ignored.
const ENV_SECTIONS: [&str; 6] = [
    "fallback",
    "unwrap_causes",
    "max_cause_depth",
    "fill_instance",
    "request_id",
    "i18n",
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProblemConfig {
    pub fallback: FallbackConfig,
    /// Try the cause chain when an exception itself has no binding.
    pub unwrap_causes: bool,
    pub max_cause_depth: usize,
    /// Copy the request instance from the context into problems lacking one.
    pub fill_instance: bool,
    /// Add the request id from the context as a `request_id` extension.
    pub request_id: bool,
    pub i18n: I18nConfig,
}

impl Default for ProblemConfig {
    fn default() -> Self {
        Self {
            fallback: FallbackConfig::default(),
            unwrap_causes: true,
            max_cause_depth: 16,
            fill_instance: true,
            request_id: true,
            i18n: I18nConfig::default(),
        }
    }
}

/// The problem produced when nothing else applies.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FallbackConfig {
    pub status: u16,
    pub title: String,
    pub type_url: Option<String>,
    /// Expose the exception message as `detail`. Meant for debugging
    /// environments only.
    pub verbose_detail: bool,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            status: 500,
            title: "Internal Error".to_owned(),
            type_url: None,
            verbose_detail: false,
        }
    }
}

impl FallbackConfig {
    /// The fallback problem, without detail.
    ///
    /// # Errors
    /// Returns [`ValidationError`] if the configured members do not form a
    /// valid problem.
    pub fn to_problem(&self) -> Result<Problem, ValidationError> {
        let mut builder = Problem::builder()
            .title(self.title.as_str())
            .status(self.status);
        if let Some(type_url) = &self.type_url {
            builder = builder.type_url(type_url.as_str());
        }
        builder.build()
    }
}

/// Localized titles and details.
///
/// Message codes are `<code_prefix><separator><problem type>` for titles and
/// the same code followed by `.detail` for details. `about:blank` problems,
/// the default fallback included, use `<code_prefix><separator>about:blank<separator><status>`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct I18nConfig {
    pub enabled: bool,
    pub code_prefix: String,
    pub separator: String,
    pub default_locale: Option<String>,
    /// locale -> message code -> template
    pub messages: HashMap<String, HashMap<String, String>>,
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            code_prefix: "problem".to_owned(),
            separator: ".".to_owned(),
            default_locale: None,
            messages: HashMap::new(),
        }
    }
}

impl ProblemConfig {
    /// Extract the configuration from an already assembled figment.
    ///
    /// # Errors
    /// Returns [`ConfigError::Load`] when extraction fails and
    /// [`ConfigError::InvalidFallback`] when the fallback problem is invalid.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.fallback.to_problem()?;
        Ok(config)
    }

    /// Defaults, then `path` (if any), then the environment.
    ///
    /// # Errors
    /// See [`ProblemConfig::from_figment`].
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            tracing::debug!(path = %path.display(), "loading problem configuration file");
            figment = figment.merge(Yaml::file(path));
        }
        figment = figment.merge(
            Env::prefixed(ENV_PREFIX)
                .split("__")
                .filter(|key| is_known_section(key.as_str())),
        );
        Self::from_figment(&figment)
    }
}

fn is_known_section(key: &str) -> bool {
    let section = key.split("__").next().and_then(|k| k.split('.').next());
    section.is_some_and(|section| {
        ENV_SECTIONS
            .iter()
            .any(|known| known.eq_ignore_ascii_case(section))
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use figment::Jail;
    use http::StatusCode;

    #[test]
    fn defaults_describe_internal_error_fallback() {
        let config = ProblemConfig::default();
        let fallback = config.fallback.to_problem().unwrap();
        assert_eq!(fallback.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(fallback.title(), "Internal Error");
        assert!(fallback.is_about_blank());
        assert!(config.unwrap_causes);
        assert!(!config.fallback.verbose_detail);
        assert!(!config.i18n.enabled);
    }

    #[test]
    fn from_figment_fills_missing_sections_with_defaults() {
        let figment = Figment::new().merge(Serialized::defaults(serde_json::json!({
            "fallback": { "status": 503 },
            "request_id": false
        })));
        let config = ProblemConfig::from_figment(&figment).unwrap();
        assert_eq!(config.fallback.status, 503);
        assert_eq!(config.fallback.title, "Internal Error");
        assert!(!config.request_id);
        assert_eq!(config.max_cause_depth, 16);
    }

    #[test]
    fn invalid_fallback_is_rejected() {
        let figment = Figment::new().merge(Serialized::defaults(serde_json::json!({
            "fallback": { "status": 999 }
        })));
        let err = ProblemConfig::from_figment(&figment).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidFallback(ValidationError::InvalidStatus(999))
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let figment = Figment::new().merge(Serialized::defaults(serde_json::json!({
            "fallbak": { "status": 500 }
        })));
        assert!(matches!(
            ProblemConfig::from_figment(&figment),
            Err(ConfigError::Load(_))
        ));
    }

    #[test]
    fn yaml_file_and_environment_are_layered() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "problem.yaml",
                r"
fallback:
  title: Something went wrong
  type_url: https://problems.example/general/internal-error
i18n:
  enabled: true
  default_locale: en
  messages:
    en:
      problem.about:blank.500: Problem
",
            )?;
            jail.set_env("PROBLEM_FALLBACK__VERBOSE_DETAIL", "true");
            jail.set_env("PROBLEM_MAX_CAUSE_DEPTH", "4");

            let config = ProblemConfig::load(Some(Path::new("problem.yaml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.fallback.title, "Something went wrong");
            assert!(config.fallback.verbose_detail);
            assert_eq!(config.max_cause_depth, 4);
            assert!(config.i18n.enabled);
            assert_eq!(
                config.i18n.messages["en"]["problem.about:blank.500"],
                "Problem"
            );
            Ok(())
        });
    }

    #[test]
    fn unrelated_prefixed_variables_are_ignored() {
        Jail::expect_with(|jail| {
            jail.set_env("PROBLEM_REQUEST_ID", "false");
            jail.set_env("PROBLEM_SOLVER_THREADS", "8");
            jail.set_env("PROBLEM_DB__URL", "postgres://localhost/problems");

            let config = ProblemConfig::load(None).map_err(|e| e.to_string())?;
            assert!(!config.request_id);
            assert_eq!(config.fallback, FallbackConfig::default());
            Ok(())
        });
    }

    #[test]
    fn known_sections_match_regardless_of_case_and_nesting() {
        assert!(is_known_section("FALLBACK__VERBOSE_DETAIL"));
        assert!(is_known_section("fallback.verbose_detail"));
        assert!(is_known_section("max_cause_depth"));
        assert!(!is_known_section("solver_threads"));
        assert!(!is_known_section("db.url"));
    }
}
