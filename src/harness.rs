//! Benchmark harness: runs a table of (file, method) pairs and times each.

use crate::baseline;
use crate::error::{self, LineCountError, Result};
use crate::estimate::{count_lines_estimate, EstimateParams};
use crate::exact::count_lines_exact;
use crate::reference::count_lines_wc;
use rand::Rng;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Wc,
    Exact,
    Estimate,
    Buffered,
    FillBuf,
    DirectIo,
    Memmap,
    MemmapSimd,
    Vectored,
    IoUring,
}

impl Method {
    pub const ALL: [Method; 10] = [
        Method::Wc,
        Method::Exact,
        Method::Estimate,
        Method::Buffered,
        Method::FillBuf,
        Method::DirectIo,
        Method::Memmap,
        Method::MemmapSimd,
        Method::Vectored,
        Method::IoUring,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Method::Wc => "wc",
            Method::Exact => "exact",
            Method::Estimate => "estimate",
            Method::Buffered => "buffered",
            Method::FillBuf => "fill-buf",
            Method::DirectIo => "direct-io",
            Method::Memmap => "memmap",
            Method::MemmapSimd => "memmap-simd",
            Method::Vectored => "vectored",
            Method::IoUring => "io-uring",
        }
    }

    pub fn run<R: Rng + ?Sized>(
        &self,
        path: &Path,
        params: &EstimateParams,
        rng: &mut R,
    ) -> Result<u64> {
        match self {
            Method::Wc => count_lines_wc(path),
            Method::Exact => count_lines_exact(path),
            Method::Estimate => count_lines_estimate(path, params, rng),
            Method::Buffered => baseline::count_lines_buffered(path),
            Method::FillBuf => baseline::count_newlines_fill_buf(path),
            Method::DirectIo => baseline::count_newlines_direct_io(path),
            Method::Memmap => baseline::count_newlines_memmap(path),
            Method::MemmapSimd => baseline::count_newlines_memmap_simd(path),
            Method::Vectored => baseline::count_newlines_vectored_io(path),
            Method::IoUring => baseline::count_newlines_io_uring(path),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Method::ALL
            .iter()
            .copied()
            .find(|m| m.name() == s)
            .ok_or_else(|| {
                let names: Vec<_> = Method::ALL.iter().map(Method::name).collect();
                format!("unknown method '{s}', expected one of: {}", names.join(", "))
            })
    }
}

#[derive(Debug)]
pub struct Measurement {
    pub file: PathBuf,
    pub method: Method,
    pub result: Result<u64>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct SuiteOptions {
    pub params: EstimateParams,
    pub drop_caches: bool,
}

/// Runs every method against every file, files in the outer loop. A failing
/// method is recorded and the suite moves on.
pub fn run_suite<R: Rng + ?Sized>(
    files: &[PathBuf],
    methods: &[Method],
    options: &SuiteOptions,
    rng: &mut R,
) -> Vec<Measurement> {
    let mut measurements = Vec::with_capacity(files.len() * methods.len());

    for file in files {
        for &method in methods {
            if options.drop_caches {
                if let Err(e) = drop_page_cache() {
                    warn!(error = %e, "could not drop page cache");
                }
            }

            let start = Instant::now();
            let result = method.run(file, &options.params, rng);
            let elapsed = start.elapsed();

            match &result {
                Ok(count) => info!(file = %file.display(), %method, count, ?elapsed, "measured"),
                Err(e) => warn!(file = %file.display(), %method, error = %e, "method failed"),
            }

            measurements.push(Measurement {
                file: file.clone(),
                method,
                result,
                elapsed,
            });
        }
    }

    measurements
}

/// How `count_with_mode` picks between a full scan and sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountMode {
    Exact,
    Estimate,
    /// Exact below the size threshold, sampled at or above it.
    Auto,
}

/// Counts `path` in the given mode. In `Auto` mode a sample without any
/// newline falls back to an exact count; in `Estimate` mode it is an error.
pub fn count_with_mode<R: Rng + ?Sized>(
    path: &Path,
    mode: CountMode,
    small_file_threshold: u64,
    params: &EstimateParams,
    rng: &mut R,
) -> Result<u64> {
    match mode {
        CountMode::Exact => count_lines_exact(path),
        CountMode::Estimate => count_lines_estimate(path, params, rng),
        CountMode::Auto => {
            let size = error::metadata(path)?.len();
            if size < small_file_threshold {
                return count_lines_exact(path);
            }
            match count_lines_estimate(path, params, rng) {
                Err(LineCountError::InsufficientSampleData { bytes_read }) => {
                    warn!(bytes_read, "no newline sampled, falling back to an exact count");
                    count_lines_exact(path)
                }
                other => other,
            }
        }
    }
}

/// Asks the kernel to drop clean page cache entries so the next read comes
/// from storage.
pub fn drop_page_cache() -> Result<()> {
    let mut command = Command::new("sudo");
    command
        .arg("-n")
        .arg("sh")
        .arg("-c")
        .arg("sync; echo 3 > /proc/sys/vm/drop_caches");
    run_cache_drop(command)
}

fn run_cache_drop(mut command: Command) -> Result<()> {
    let output = command
        .output()
        .map_err(|e| LineCountError::CacheDrop(format!("cannot run {command:?}: {e}")))?;

    if !output.status.success() {
        return Err(LineCountError::CacheDrop(format!(
            "{command:?} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}
