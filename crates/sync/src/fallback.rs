//! Try semantically equivalent remote operations until one succeeds.
//!
//! Some backend routes are not stable (the clear route has shipped under
//! several names), so a single logical action is expressed as an ordered
//! list of candidates. Candidates run strictly in order; the first one whose
//! response reports business-level success wins. A transport-level success
//! carrying `status: false` is a failure and moves on to the next candidate.
//!
//! The protocol is a bounded loop: at most `N` attempts for `N` candidates.

use std::fmt;
use std::future::Future;

use thiserror::Error;
use tracing::{debug, warn};

use crate::error::CartError;

/// The winning candidate of a fallback run.
#[derive(Debug)]
pub struct FallbackSuccess<C, T> {
    pub candidate: C,
    /// 1-based number of attempts made, including the successful one.
    pub attempts: usize,
    pub value: T,
}

/// One failed candidate.
#[derive(Debug)]
pub struct FailedAttempt<C> {
    pub candidate: C,
    pub error: CartError,
}

/// Every candidate failed.
#[derive(Debug, Error)]
pub enum FallbackError<C: fmt::Display + fmt::Debug> {
    #[error("All {} candidates failed{}", .failures.len(), format_failures(.failures))]
    Exhausted { failures: Vec<FailedAttempt<C>> },
}

impl<C: fmt::Display + fmt::Debug> FallbackError<C> {
    /// Failed attempts in the order they were made.
    #[must_use]
    pub fn failures(&self) -> &[FailedAttempt<C>] {
        match self {
            Self::Exhausted { failures } => failures,
        }
    }

    /// Number of attempts made before giving up.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.failures().len()
    }
}

fn format_failures<C: fmt::Display>(failures: &[FailedAttempt<C>]) -> String {
    if failures.is_empty() {
        return String::new();
    }
    let detail = failures
        .iter()
        .map(|f| format!("{}: {}", f.candidate, f.error))
        .collect::<Vec<_>>()
        .join("; ");
    format!(": {detail}")
}

/// Ordered list of candidates for one logical remote action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointFallbackProtocol<C> {
    candidates: Vec<C>,
}

impl<C> EndpointFallbackProtocol<C>
where
    C: Clone + fmt::Display + fmt::Debug,
{
    #[must_use]
    pub const fn new(candidates: Vec<C>) -> Self {
        Self { candidates }
    }

    #[must_use]
    pub fn candidates(&self) -> &[C] {
        &self.candidates
    }

    /// Run `attempt` against each candidate in order, stopping at the first
    /// success.
    ///
    /// # Errors
    ///
    /// Returns `FallbackError::Exhausted` with every failure, in order, when no
    /// candidate succeeds. An empty candidate list is exhausted immediately.
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<FallbackSuccess<C, T>, FallbackError<C>>
    where
        F: FnMut(C) -> Fut,
        Fut: Future<Output = Result<T, CartError>>,
    {
        let mut failures = Vec::with_capacity(self.candidates.len());

        for (index, candidate) in self.candidates.iter().enumerate() {
            debug!(candidate = %candidate, attempt = index + 1, "Trying fallback candidate");

            match attempt(candidate.clone()).await {
                Ok(value) => {
                    return Ok(FallbackSuccess {
                        candidate: candidate.clone(),
                        attempts: index + 1,
                        value,
                    });
                }
                Err(error) => {
                    warn!(candidate = %candidate, error = %error, "Fallback candidate failed");
                    failures.push(FailedAttempt {
                        candidate: candidate.clone(),
                        error,
                    });
                }
            }
        }

        Err(FallbackError::Exhausted { failures })
    }
}
