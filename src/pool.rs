//! Worker pool plumbing.
//!
//! `jobs == 1` runs every task on the caller thread, in order, with no pool
//! involved at all. Anything above one builds a dedicated rayon pool of
//! exactly that size.
use rayon::prelude::*;

use crate::error::Error;

/// Default worker count: available parallelism plus headroom for IO-bound
/// tasks.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        + 4
}

/// Apply `task` to every element of `tasks`, with `jobs` workers.
pub fn map_tasks<T, R, F>(jobs: usize, tasks: Vec<T>, task: F) -> Result<Vec<R>, Error>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync + Send,
{
    if jobs <= 1 {
        return Ok(tasks.into_iter().map(task).collect());
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| Error::Custom(format!("could not build worker pool: {}", e)))?;
    Ok(pool.install(|| tasks.into_par_iter().map(task).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_and_parallel_agree() {
        let tasks: Vec<u64> = (0..100).collect();
        let seq = map_tasks(1, tasks.clone(), |x| x * 2).unwrap();
        let par = map_tasks(4, tasks, |x| x * 2).unwrap();
        assert_eq!(seq, par);
    }
}
