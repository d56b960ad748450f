//! Exception type tags and the [`Exception`] trait.
//!
//! Rust errors carry no runtime class hierarchy, so every error that should
//! be translated into a [`Problem`] declares a static [`ExceptionType`] with
//! its supertypes spelled out. The registry walks that declared ancestry to
//! pick the most specific resolver.
//!
//! ```rust,ignore
//! problem::exception_type!(pub static CLIENT_ERROR = "ClientError");
//! problem::exception_type!(pub static NOT_FOUND = "NotFound": CLIENT_ERROR);
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("{0} not found")]
//! pub struct NotFound(pub String);
//!
//! problem::exception!(NotFound => NOT_FOUND);
//! ```

use std::collections::{HashSet, VecDeque};
use std::fmt;

use crate::problem::Problem;

/// Static descriptor of an exception type.
///
/// `name` is the stable identity of the type: two descriptors with the same
/// name are treated as the same type. Every type implicitly descends from
/// [`ExceptionType::ROOT`].
pub struct ExceptionType {
    pub name: &'static str,
    pub supertypes: &'static [&'static ExceptionType],
}

impl ExceptionType {
    /// Implicit ancestor of every exception type. A resolver bound to it
    /// catches everything nothing more specific handles.
    pub const ROOT: ExceptionType = ExceptionType {
        name: "Error",
        supertypes: &[],
    };

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether `self` is `other` or descends from it.
    #[must_use]
    pub fn is_a(&self, other: &ExceptionType) -> bool {
        self.ancestry().iter().any(|(t, _)| t.name == other.name)
    }

    /// Every type `self` is assignable to, paired with its distance.
    ///
    /// Breadth-first from `self` (depth 0) through the declared supertypes,
    /// each type listed once at its shortest distance, in declaration order.
    /// The root comes last unless it was declared explicitly.
    #[must_use]
    pub fn ancestry(&self) -> Vec<(&ExceptionType, usize)> {
        let mut out: Vec<(&ExceptionType, usize)> = Vec::new();
        let mut seen: HashSet<&'static str> = HashSet::new();
        let mut queue: VecDeque<(&ExceptionType, usize)> = VecDeque::new();
        queue.push_back((self, 0));

        while let Some((ty, depth)) = queue.pop_front() {
            if !seen.insert(ty.name) {
                continue;
            }
            out.push((ty, depth));
            for &sup in ty.supertypes {
                queue.push_back((sup, depth + 1));
            }
        }

        if !seen.contains(Self::ROOT.name) {
            let depth = out.last().map_or(0, |(_, d)| d + 1);
            out.push((&Self::ROOT, depth));
        }
        out
    }
}

impl fmt::Debug for ExceptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl PartialEq for ExceptionType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ExceptionType {}

/// An error that can be translated into a [`Problem`].
pub trait Exception: std::error::Error + Send + Sync + 'static {
    /// Declared type of this error.
    fn exception_type(&self) -> &'static ExceptionType;

    /// The exception that caused this one, if it is itself translatable.
    fn cause_exception(&self) -> Option<&dyn Exception> {
        None
    }

    /// A finished problem carried by the error, used as-is.
    fn problem(&self) -> Option<&Problem> {
        None
    }
}

impl dyn Exception {
    /// Downcast to the concrete error type.
    #[must_use]
    pub fn downcast_ref<T: Exception>(&self) -> Option<&T> {
        let err: &(dyn std::error::Error + 'static) = self;
        err.downcast_ref::<T>()
    }
}

/// An [`Exception`] whose type tag is known statically, for typed resolvers.
pub trait TypedException: Exception + Sized {
    fn static_type() -> &'static ExceptionType;
}

/// Declare a static [`ExceptionType`].
///
/// ```rust,ignore
/// exception_type!(pub static IO_ERROR = "IoError");
/// exception_type!(pub static TIMEOUT = "Timeout": IO_ERROR, RETRYABLE);
/// ```
#[macro_export]
macro_rules! exception_type {
    ($(#[$meta:meta])* $vis:vis static $name:ident = $label:literal $(: $($sup:path),+ )? $(;)?) => {
        $(#[$meta])*
        $vis static $name: $crate::ExceptionType = $crate::ExceptionType {
            name: $label,
            supertypes: &[$($(&$sup),+)?],
        };
    };
}

/// Implement [`Exception`] and [`TypedException`] for a concrete error type.
///
/// ```rust,ignore
/// exception!(NotFound => NOT_FOUND);
/// ```
#[macro_export]
macro_rules! exception {
    ($ty:ty => $tag:path) => {
        impl $crate::Exception for $ty {
            fn exception_type(&self) -> &'static $crate::ExceptionType {
                &$tag
            }
        }

        impl $crate::TypedException for $ty {
            fn static_type() -> &'static $crate::ExceptionType {
                &$tag
            }
        }
    };
}

exception_type!(
    /// Type of [`ProblemError`].
    pub static PROBLEM_ERROR = "ProblemError"
);

/// An error that already knows the problem it stands for.
///
/// The engine returns the carried problem without consulting the registry.
#[derive(Debug, Clone)]
pub struct ProblemError {
    problem: Problem,
}

impl ProblemError {
    pub fn new(problem: Problem) -> Self {
        Self { problem }
    }

    #[must_use]
    pub fn into_problem(self) -> Problem {
        self.problem
    }
}

impl From<Problem> for ProblemError {
    fn from(problem: Problem) -> Self {
        Self::new(problem)
    }
}

impl fmt::Display for ProblemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.problem.detail().unwrap_or(self.problem.title()))
    }
}

impl std::error::Error for ProblemError {}

impl Exception for ProblemError {
    fn exception_type(&self) -> &'static ExceptionType {
        &PROBLEM_ERROR
    }

    fn problem(&self) -> Option<&Problem> {
        Some(&self.problem)
    }
}

impl TypedException for ProblemError {
    fn static_type() -> &'static ExceptionType {
        &PROBLEM_ERROR
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use http::StatusCode;

    exception_type!(static RUNTIME = "Runtime");
    exception_type!(static RETRYABLE = "Retryable");
    exception_type!(static IO = "Io": RUNTIME);
    exception_type!(static TIMEOUT = "Timeout": IO, RETRYABLE);

    fn names(ty: &ExceptionType) -> Vec<(&'static str, usize)> {
        ty.ancestry().into_iter().map(|(t, d)| (t.name, d)).collect()
    }

    #[test]
    fn ancestry_is_breadth_first_and_ends_at_root() {
        assert_eq!(
            names(&TIMEOUT),
            [
                ("Timeout", 0),
                ("Io", 1),
                ("Retryable", 1),
                ("Runtime", 2),
                ("Error", 3)
            ]
        );
        assert_eq!(names(&ExceptionType::ROOT), [("Error", 0)]);
    }

    #[test]
    fn is_a_follows_declared_supertypes() {
        assert!(TIMEOUT.is_a(&RUNTIME));
        assert!(TIMEOUT.is_a(&RETRYABLE));
        assert!(TIMEOUT.is_a(&ExceptionType::ROOT));
        assert!(!IO.is_a(&RETRYABLE));
    }

    #[test]
    fn problem_error_message_prefers_detail() {
        let with_detail = ProblemError::new(
            Problem::status_only(StatusCode::NOT_FOUND).with_detail("user 42 does not exist"),
        );
        assert_eq!(with_detail.to_string(), "user 42 does not exist");

        let title_only = ProblemError::from(Problem::status_only(StatusCode::NOT_FOUND));
        assert_eq!(title_only.to_string(), "Not Found");
    }

    #[test]
    fn downcast_recovers_concrete_type() {
        let err = ProblemError::new(Problem::status_only(StatusCode::GONE));
        let dynamic: &dyn Exception = &err;
        assert!(dynamic.downcast_ref::<ProblemError>().is_some());
        assert_eq!(
            dynamic.problem().map(Problem::status),
            Some(Some(StatusCode::GONE))
        );
    }
}
