// src/config.rs

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::error::{ConstructionError, Result};
use crate::read_buffer::MEGABYTE;

/// Maximum number of doubling rounds. Labels of `1 << MAX_DOUBLING_STEPS` ranks fit in a path node.
pub const MAX_DOUBLING_STEPS: usize = 3;

/// Parameters for building the path graph.
#[derive(Clone, Debug)]
pub struct ConstructionParameters {
    doubling_steps: usize,
    threads: usize,
    run_size: usize,
    buffer_size: usize,
    temp_dir: Option<PathBuf>,
    verify: bool,
}

impl Default for ConstructionParameters {
    fn default() -> Self {
        Self {
            doubling_steps: MAX_DOUBLING_STEPS,
            threads: num_cpus::get(),
            run_size: MEGABYTE,
            buffer_size: MEGABYTE,
            temp_dir: None,
            verify: false,
        }
    }
}

impl ConstructionParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of doubling rounds, clamped to `1..=MAX_DOUBLING_STEPS`.
    pub fn with_doubling_steps(mut self, steps: usize) -> Self {
        self.doubling_steps = steps.clamp(1, MAX_DOUBLING_STEPS);
        self
    }

    /// Worker threads for the driver's thread pool (at least 1).
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Path nodes per sorted run file.
    pub fn with_run_size(mut self, nodes: usize) -> Self {
        self.run_size = nodes.max(1);
        self
    }

    /// Records kept in memory by each run reader during merging.
    pub fn with_buffer_size(mut self, records: usize) -> Self {
        self.buffer_size = records.max(2);
        self
    }

    pub fn with_temp_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.temp_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Check the sorted path nodes after construction.
    pub fn verify(mut self, yes: bool) -> Self {
        self.verify = yes;
        self
    }

    pub fn doubling_steps(&self) -> usize {
        self.doubling_steps
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn run_size(&self) -> usize {
        self.run_size
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn should_verify(&self) -> bool {
        self.verify
    }

    /// Creates a scratch directory for run files. It is removed when dropped.
    pub fn scratch_dir(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(".gcsa_runs_");
        match &self.temp_dir {
            Some(dir) => builder
                .tempdir_in(dir)
                .map_err(|e| ConstructionError::resource(dir, e)),
            None => builder
                .tempdir()
                .map_err(|e| ConstructionError::resource(std::env::temp_dir(), e)),
        }
    }
}
