// Copyright (c) The Corral Project Authors.
// Licensed under the MIT License.

//! Error types for fill operations.

use std::fmt;

/// Classifies why a fill operation failed.
///
/// The two kinds are deliberately distinct: a computation failure belongs to
/// the caller's expensive function and is worth retrying with backoff, while
/// a deadline failure means the coordinator never observed a result in time
/// and says nothing about whether the computation itself is healthy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillErrorKind {
    /// The caller-supplied computation returned an error. The cache was left
    /// untouched, so a subsequent call retries the computation.
    ComputationFailed,
    /// The wait deadline elapsed without an observable result, and either the
    /// configured policy declined to self-compute or the fallback computation
    /// also failed.
    DeadlineExceeded,
}

impl fmt::Display for FillErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ComputationFailed => f.write_str("computation failed"),
            Self::DeadlineExceeded => f.write_str("wait deadline exceeded"),
        }
    }
}

/// An error from a [`Coordinator`](crate::Coordinator) fill operation.
///
/// When the failure originates in the caller-supplied computation, the
/// original error is attached as the source and can be recovered with
/// [`ohno::ErrorExt::find_source`].
///
/// # Examples
///
/// ```
/// use corral::FillErrorKind;
///
/// # fn handle(error: &corral::FillError) {
/// match error.kind {
///     FillErrorKind::ComputationFailed => { /* retry with backoff */ }
///     FillErrorKind::DeadlineExceeded => { /* shed load */ }
/// }
/// # }
/// ```
#[ohno::error]
#[display("cache fill failed: {kind}")]
pub struct FillError {
    /// What went wrong.
    pub kind: FillErrorKind,
}

impl FillError {
    /// Returns `true` when the caller-supplied computation failed.
    #[must_use]
    pub fn is_computation_failed(&self) -> bool {
        self.kind == FillErrorKind::ComputationFailed
    }

    /// Returns `true` when the wait deadline elapsed without a result.
    #[must_use]
    pub fn is_deadline_exceeded(&self) -> bool {
        self.kind == FillErrorKind::DeadlineExceeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ohno::ErrorExt;

    #[test]
    fn display_names_the_kind() {
        let error = FillError::new(FillErrorKind::ComputationFailed);
        assert!(format!("{error}").contains("computation failed"));

        let error = FillError::new(FillErrorKind::DeadlineExceeded);
        assert!(format!("{error}").contains("wait deadline exceeded"));
    }

    #[test]
    fn kind_predicates() {
        let error = FillError::new(FillErrorKind::ComputationFailed);
        assert!(error.is_computation_failed());
        assert!(!error.is_deadline_exceeded());
    }

    #[test]
    fn source_carries_the_computation_error() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "backend down");
        let error = FillError::caused_by(FillErrorKind::ComputationFailed, io);

        let source = error.find_source::<std::io::Error>().expect("io error should be in the chain");
        assert_eq!(source.kind(), std::io::ErrorKind::ConnectionRefused);
    }
}
