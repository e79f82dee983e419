/// Concurrency management for solgraph.
/// Source files of one import frontier are parsed on the global rayon pool.

use anyhow::{Context, Result};

/// Worker count: the requested number, or half the cores with a minimum of one.
pub fn worker_count(jobs: Option<usize>, cores: usize) -> usize {
    jobs.unwrap_or(cores / 2).max(1)
}

/// Initialize the global rayon thread pool.
pub fn init_thread_pool(jobs: Option<usize>) -> Result<usize> {
    let cores = num_cpus::get();
    let workers = worker_count(jobs, cores);

    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build_global()
        .context("Failed to initialize the thread pool")?;

    log::info!(
        "initialized thread pool: {} workers (system has {} cores)",
        workers,
        cores
    );

    Ok(workers)
}
