#![forbid(unsafe_code)]

//! Error types for view-model resolution and teardown.

use std::fmt;

use crate::viewmodel::{BoxError, ViewModelKey};

/// Errors raised while resolving a view-model.
#[derive(Debug)]
pub enum ViewModelError {
    /// No owner was passed and no scope is active.
    NoActiveScope,
    /// The factory failed to build the requested kind.
    Construction {
        /// Type name of the requested view-model.
        kind: &'static str,
        /// Error returned by the factory.
        source: BoxError,
    },
    /// The store holds a value of another type under the requested key.
    KindMismatch {
        /// The key that was looked up.
        key: ViewModelKey,
    },
}

impl fmt::Display for ViewModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoActiveScope => write!(
                f,
                "no active view-model scope: called outside an initialization phase \
                 without an explicit owner"
            ),
            Self::Construction { kind, source } => {
                write!(f, "failed to construct view-model `{kind}`: {source}")
            }
            Self::KindMismatch { key } => write!(
                f,
                "store entry for `{key}` holds a value of a different type"
            ),
        }
    }
}

impl std::error::Error for ViewModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Construction { source, .. } => Some(&**source),
            _ => None,
        }
    }
}

/// One view-model whose `release` failed during teardown.
#[derive(Debug)]
pub struct ReleaseFailure {
    /// Key the view-model was stored under.
    pub key: ViewModelKey,
    /// Error returned by `release`.
    pub error: BoxError,
}

impl fmt::Display for ReleaseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`: {}", self.key, self.error)
    }
}

/// Aggregate of every `release` failure from a single teardown.
///
/// By the time this is returned, every held view-model has had `release`
/// called and the store has been cleared.
#[derive(Debug)]
pub struct TeardownError {
    released: usize,
    failures: Vec<ReleaseFailure>,
}

impl TeardownError {
    pub(crate) fn new(released: usize, failures: Vec<ReleaseFailure>) -> Self {
        debug_assert!(!failures.is_empty());
        Self { released, failures }
    }

    /// Number of view-models `release` was called on, including failures.
    #[must_use]
    pub fn released(&self) -> usize {
        self.released
    }

    /// The individual failures.
    #[must_use]
    pub fn failures(&self) -> &[ReleaseFailure] {
        &self.failures
    }

    /// Consume into the individual failures.
    #[must_use]
    pub fn into_failures(self) -> Vec<ReleaseFailure> {
        self.failures
    }
}

impl fmt::Display for TeardownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} view-model(s) failed to release",
            self.failures.len(),
            self.released
        )?;
        for failure in &self.failures {
            write!(f, "; {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for TeardownError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.failures.first().map(|failure| &*failure.error)
    }
}
