//! Process-wide thread pool for force loops
//!
//! The pool is built once on first use; later calls return the same pool
//! regardless of the requested thread count.

use std::sync::OnceLock;

use rayon::{ThreadPool, ThreadPoolBuilder};

/// Threads used when the core count cannot be detected
pub const FALLBACK_THREADS: usize = 4;

static POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();

/// Shared rayon pool.
///
/// `num_threads == 0` uses the detected core count. Only the first call
/// decides the size. Returns `None` if the pool could not be built; work
/// then runs on rayon's global pool through [`install`].
pub fn thread_pool(num_threads: usize) -> Option<&'static ThreadPool> {
    POOL.get_or_init(|| {
        let threads = resolve_threads(num_threads);
        tracing::debug!(threads, "building shared force thread pool");
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("ar-force-{i}"))
            .build()
            .map_err(|e| {
                tracing::warn!(error = %e, "shared thread pool failed, using rayon global pool");
            })
            .ok()
    })
    .as_ref()
}

/// Run `op` inside the shared pool.
pub fn install<OP, R>(op: OP) -> R
where
    OP: FnOnce() -> R + Send,
    R: Send,
{
    match thread_pool(0) {
        Some(pool) => pool.install(op),
        None => op(),
    }
}

fn resolve_threads(num_threads: usize) -> usize {
    if num_threads > 0 {
        return num_threads;
    }
    std::thread::available_parallelism().map_or_else(
        |_| {
            tracing::warn!(
                fallback = FALLBACK_THREADS,
                "could not detect hardware concurrency"
            );
            FALLBACK_THREADS
        },
        std::num::NonZeroUsize::get,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_threads_explicit() {
        assert_eq!(resolve_threads(3), 3);
        assert!(resolve_threads(0) >= 1);
    }

    #[test]
    fn test_thread_pool_is_shared() {
        let a = thread_pool(2).map(|p| p as *const ThreadPool);
        let b = thread_pool(8).map(|p| p as *const ThreadPool);
        assert!(a.is_some());
        assert_eq!(a, b);
    }

    #[test]
    fn test_install_runs_in_pool() {
        let sum: u64 = install(|| {
            use rayon::prelude::*;
            (1..=100u64).into_par_iter().sum()
        });
        assert_eq!(sum, 5050);
    }
}
