//! Well-known problem definitions.

use http::StatusCode;

use crate::problem::Problem;

/// Static problem definition: everything but the occurrence-specific parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProblemDef {
    pub status: StatusCode,
    pub title: &'static str,
    pub type_url: &'static str,
}

impl ProblemDef {
    #[must_use]
    pub const fn new(status: StatusCode, title: &'static str, type_url: &'static str) -> Self {
        Self {
            status,
            title,
            type_url,
        }
    }

    /// Build the problem without a detail.
    ///
    /// Definitions are checked by the catalog tests, so a malformed one is a
    /// programming error; it degrades to a status-only problem instead of
    /// failing at runtime.
    pub fn to_problem(&self) -> Problem {
        Problem::builder()
            .type_url(self.type_url)
            .title(self.title)
            .status(self.status)
            .build()
            .unwrap_or_else(|_| Problem::status_only(self.status))
    }

    /// Build the problem with the given detail.
    pub fn with_detail(&self, detail: impl Into<String>) -> Problem {
        self.to_problem().with_detail(detail)
    }
}

/// Problems not tied to any particular transport or subsystem.
pub mod general {
    use super::{ProblemDef, StatusCode};

    pub const ILLEGAL_ARGUMENT: ProblemDef = ProblemDef::new(
        StatusCode::BAD_REQUEST,
        "Illegal Argument",
        "https://problems.example/general/illegal-argument",
    );
    pub const INTERNAL_ERROR: ProblemDef = ProblemDef::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal Error",
        "https://problems.example/general/internal-error",
    );
    pub const UNSUPPORTED_OPERATION: ProblemDef = ProblemDef::new(
        StatusCode::NOT_IMPLEMENTED,
        "Unsupported Operation",
        "https://problems.example/general/unsupported-operation",
    );
}

/// Problems raised while negotiating an HTTP exchange.
pub mod web {
    use super::{ProblemDef, StatusCode};

    pub const BAD_REQUEST: ProblemDef = ProblemDef::new(
        StatusCode::BAD_REQUEST,
        "Bad Request",
        "https://problems.example/web/bad-request",
    );
    pub const METHOD_NOT_ALLOWED: ProblemDef = ProblemDef::new(
        StatusCode::METHOD_NOT_ALLOWED,
        "Method Not Allowed",
        "https://problems.example/web/method-not-allowed",
    );
    pub const NOT_ACCEPTABLE: ProblemDef = ProblemDef::new(
        StatusCode::NOT_ACCEPTABLE,
        "Not Acceptable",
        "https://problems.example/web/not-acceptable",
    );
    pub const UNSUPPORTED_MEDIA_TYPE: ProblemDef = ProblemDef::new(
        StatusCode::UNSUPPORTED_MEDIA_TYPE,
        "Unsupported Media Type",
        "https://problems.example/web/unsupported-media-type",
    );
    pub const NO_HANDLER_FOUND: ProblemDef = ProblemDef::new(
        StatusCode::NOT_FOUND,
        "No Handler Found",
        "https://problems.example/web/no-handler-found",
    );
}

pub mod security {
    use super::{ProblemDef, StatusCode};

    pub const UNAUTHORIZED: ProblemDef = ProblemDef::new(
        StatusCode::UNAUTHORIZED,
        "Unauthorized",
        "https://problems.example/security/unauthorized",
    );
    pub const ACCESS_DENIED: ProblemDef = ProblemDef::new(
        StatusCode::FORBIDDEN,
        "Access Denied",
        "https://problems.example/security/access-denied",
    );
}

pub mod validation {
    use super::{ProblemDef, StatusCode};

    pub const CONSTRAINT_VIOLATION: ProblemDef = ProblemDef::new(
        StatusCode::BAD_REQUEST,
        "Constraint Violation",
        "https://problems.example/validation/constraint-violation",
    );
    pub const VALIDATION_FAILED: ProblemDef = ProblemDef::new(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Validation Failed",
        "https://problems.example/validation/validation-failed",
    );
}
