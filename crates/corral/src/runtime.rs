// Copyright (c) The Corral Project Authors.

//! Runtime abstraction for background tasks.
//!
//! Background work (early refresh, best-effort lease release on cancellation)
//! is spawned through this wrapper so other runtimes can be supported without
//! touching the call sites.

/// Spawns fire-and-forget background work.
#[derive(Debug, Clone, Default)]
pub(crate) struct Runtime {}

impl Runtime {
    pub(crate) fn new_tokio() -> Self {
        Self {}
    }

    /// Spawns `work` on the current tokio runtime.
    ///
    /// Returns `false` when no runtime is available; callers treat spawning
    /// as best-effort and must undo any bookkeeping themselves.
    pub(crate) fn spawn<T>(&self, work: T) -> bool
    where
        T: Future<Output = ()> + Send + 'static,
    {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                drop(handle.spawn(work));
                true
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_outside_runtime_reports_false() {
        let runtime = Runtime::new_tokio();
        assert!(!runtime.spawn(async {}));
    }

    #[tokio::test]
    async fn spawn_inside_runtime_reports_true() {
        let runtime = Runtime::new_tokio();
        assert!(runtime.spawn(async {}));
    }
}
