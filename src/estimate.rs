//! Sampling line-count estimator.
//!
//! A handful of random windows is read from the file, their newlines are
//! counted, and the average bytes per line is extrapolated to the file size.
//! Files smaller than the sampling budget are counted exactly instead.

use crate::count_newlines;
use crate::error::{self, LineCountError, Result};
use crate::exact::count_lines_exact;
use crate::window::CircularWindow;
use rand::Rng;
use std::io::{Read, Seek};
use std::path::Path;
use tracing::{debug, trace};

pub const DEFAULT_SAMPLES: usize = 5;
pub const DEFAULT_CHUNK_SIZE: usize = 1 << 16;
pub const DEFAULT_SAMPLE_LENGTH: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EstimateParams {
    pub n_samples: usize,
    pub chunk_size: usize,
    /// Chunks per sample.
    pub sample_length: usize,
}

impl Default for EstimateParams {
    fn default() -> Self {
        Self {
            n_samples: DEFAULT_SAMPLES,
            chunk_size: DEFAULT_CHUNK_SIZE,
            sample_length: DEFAULT_SAMPLE_LENGTH,
        }
    }
}

impl EstimateParams {
    pub fn validate(&self) -> Result<()> {
        if self.n_samples == 0 || self.chunk_size == 0 || self.sample_length == 0 {
            return Err(LineCountError::InvalidParameters(format!(
                "samples ({}), chunk size ({}) and sample length ({}) must all be non-zero",
                self.n_samples, self.chunk_size, self.sample_length
            )));
        }
        self.bytes_to_read().map(|_| ())
    }

    pub fn sample_bytes(&self) -> Result<u64> {
        (self.chunk_size as u64)
            .checked_mul(self.sample_length as u64)
            .ok_or_else(|| overflow(self))
    }

    /// Total bytes inspected across all samples.
    pub fn bytes_to_read(&self) -> Result<u64> {
        self.sample_bytes()?
            .checked_mul(self.n_samples as u64)
            .ok_or_else(|| overflow(self))
    }

    /// Whether sampling reads strictly less than a full scan of `total_bytes`.
    pub fn should_sample(&self, total_bytes: u64) -> Result<bool> {
        Ok(self.bytes_to_read()? < total_bytes)
    }
}

fn overflow(params: &EstimateParams) -> LineCountError {
    LineCountError::InvalidParameters(format!("sampling budget overflows u64: {params:?}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimateMethod {
    /// The file was within the sampling budget and was scanned in full.
    Exact,
    Sampled { n_newlines: u64, bytes_read: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Estimate {
    pub lines: u64,
    pub total_bytes: u64,
    pub method: EstimateMethod,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleCount {
    pub bytes: u64,
    pub newlines: u64,
}

pub fn count_lines_estimate<R: Rng + ?Sized>(
    path: &Path,
    params: &EstimateParams,
    rng: &mut R,
) -> Result<u64> {
    estimate(path, params, rng).map(|e| e.lines)
}

pub fn estimate<R: Rng + ?Sized>(
    path: &Path,
    params: &EstimateParams,
    rng: &mut R,
) -> Result<Estimate> {
    params.validate()?;

    let total_bytes = error::metadata(path)?.len();
    let n_bytes_read = params.bytes_to_read()?;
    debug!(
        path = %path.display(),
        total_bytes,
        n_bytes_read,
        "sampling budget"
    );

    if !params.should_sample(total_bytes)? {
        debug!("budget covers the whole file, counting exactly");
        let lines = count_lines_exact(path)?;
        return Ok(Estimate {
            lines,
            total_bytes,
            method: EstimateMethod::Exact,
        });
    }

    let mut file = error::open(path)?;
    let mut chunk = vec![0u8; params.chunk_size];
    let mut n_newlines = 0;

    for i in 0..params.n_samples {
        let start = rng.gen_range(0..total_bytes);
        let sample = read_sample(&mut file, start, params, total_bytes, &mut chunk)?;
        trace!(sample = i, start, newlines = sample.newlines, "sample read");
        n_newlines += sample.newlines;
    }

    let lines = extrapolate(total_bytes, n_bytes_read, n_newlines)?;
    debug!(n_newlines, lines, "sampled estimate");

    Ok(Estimate {
        lines,
        total_bytes,
        method: EstimateMethod::Sampled {
            n_newlines,
            bytes_read: n_bytes_read,
        },
    })
}

/// Reads one sample of `params.sample_length` chunks starting at `start`,
/// wrapping to the head of the file when the tail runs out. `chunk` is
/// scratch space and must hold `params.chunk_size` bytes.
pub fn read_sample<R: Read + Seek + ?Sized>(
    reader: &mut R,
    start: u64,
    params: &EstimateParams,
    total_bytes: u64,
    chunk: &mut [u8],
) -> Result<SampleCount> {
    if chunk.len() < params.chunk_size {
        return Err(LineCountError::InvalidParameters(format!(
            "scratch buffer of {} bytes for {} byte chunks",
            chunk.len(),
            params.chunk_size
        )));
    }

    let chunk_size = params.chunk_size as u64;
    let mut count = SampleCount::default();

    for i in 0..params.sample_length as u64 {
        let offset = start + i * chunk_size;
        let window = CircularWindow::new(offset, chunk_size, total_bytes)?;
        window.read_into(reader, &mut chunk[..params.chunk_size])?;
        count.bytes += chunk_size;
        count.newlines += count_newlines(&chunk[..params.chunk_size]);
    }

    Ok(count)
}

fn extrapolate(total_bytes: u64, n_bytes_read: u64, n_newlines: u64) -> Result<u64> {
    if n_newlines == 0 {
        return Err(LineCountError::InsufficientSampleData {
            bytes_read: n_bytes_read,
        });
    }
    let bytes_per_line = n_bytes_read as f64 / n_newlines as f64;
    Ok((total_bytes as f64 / bytes_per_line).round() as u64)
}
