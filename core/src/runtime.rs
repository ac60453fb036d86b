//! Global Rayon pool for the per-point stages (radius queries, eigen
//! features, k-means restarts).

use rayon::ThreadPoolBuilder;
use std::sync::OnceLock;

/// Environment variable read when no explicit thread count is given.
pub const CPU_THREADS_ENV: &str = "PHENOBOT_CPU_THREADS";

static POOL: OnceLock<Result<usize, String>> = OnceLock::new();

/// Thread count from an explicit value, else from the raw env value.
/// `Ok(None)` leaves the choice to Rayon.
fn resolve_thread_count(explicit: Option<usize>, env_value: Option<&str>) -> Result<Option<usize>, String> {
    let count = match (explicit, env_value) {
        (Some(n), _) => n,
        (None, Some(raw)) => raw
            .trim()
            .parse()
            .map_err(|_| format!("{} must be a positive integer, got '{}'", CPU_THREADS_ENV, raw))?,
        (None, None) => return Ok(None),
    };
    if count == 0 {
        return Err(format!("{} must be >= 1", CPU_THREADS_ENV));
    }
    Ok(Some(count))
}

/// Build the global pool once. Later calls return the first outcome whatever
/// their argument.
///
/// Priority:
/// 1. `num_threads`
/// 2. `PHENOBOT_CPU_THREADS`
/// 3. Rayon default
pub fn init_global_thread_pool(num_threads: Option<usize>) -> Result<(), String> {
    let outcome = POOL.get_or_init(|| {
        let env_value = std::env::var(CPU_THREADS_ENV).ok();
        let count = resolve_thread_count(num_threads, env_value.as_deref())?;
        let builder = match count {
            Some(n) => ThreadPoolBuilder::new().num_threads(n),
            None => ThreadPoolBuilder::new(),
        };
        builder.build_global().map_err(|e| e.to_string())?;
        Ok(rayon::current_num_threads())
    });
    outcome.clone().map(|_| ())
}

pub fn current_cpu_threads() -> usize {
    rayon::current_num_threads()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_priority() {
        assert_eq!(resolve_thread_count(Some(3), Some("8")), Ok(Some(3)));
        assert_eq!(resolve_thread_count(None, Some(" 8 ")), Ok(Some(8)));
        assert_eq!(resolve_thread_count(None, None), Ok(None));
        assert!(resolve_thread_count(None, Some("many")).is_err());
        assert!(resolve_thread_count(Some(0), None).is_err());
    }

    #[test]
    fn test_init_is_idempotent() {
        let first = init_global_thread_pool(Some(2));
        let second = init_global_thread_pool(Some(8));
        assert_eq!(first, second);
        assert!(current_cpu_threads() >= 1);
    }
}
