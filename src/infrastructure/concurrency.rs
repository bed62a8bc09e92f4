//! Concurrency management for callviz.
//! Sizes the global rayon pool used for symbol discovery.

use anyhow::{Context, Result};
use tracing::info;

/// Worker count when none is configured: half the cores, minimum 1, so the
/// language server answering discovery queries keeps its share of the CPU.
pub fn default_workers() -> usize {
    std::cmp::max(1, num_cpus::get() / 2)
}

/// Initialize the global rayon thread pool. Returns the worker count.
pub fn init_thread_pool(threads: Option<usize>) -> Result<usize> {
    let workers = threads.filter(|&n| n > 0).unwrap_or_else(default_workers);

    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build_global()
        .context("Failed to initialize thread pool")?;

    info!(workers, cores = num_cpus::get(), "initialized thread pool");

    Ok(workers)
}
