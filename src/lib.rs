//! Line counting for large files: an exact full scan and a sampling
//! estimator that extrapolates from a few random windows of the file.

pub mod baseline;
pub mod error;
pub mod estimate;
pub mod exact;
pub mod generate;
pub mod harness;
pub mod reference;
pub mod settings;
pub mod window;

pub use error::{LineCountError, Result};
pub use estimate::{
    count_lines_estimate, estimate, Estimate, EstimateMethod, EstimateParams,
};
pub use exact::{count_lines_exact, count_lines_exact_reader};

pub const NEWLINE: u8 = b'\n';

/// Block size used by the sequential counters.
pub const BUFFER_SIZE: usize = 65536;

pub fn count_newlines(buf: &[u8]) -> u64 {
    memchr::memchr_iter(NEWLINE, buf).count() as u64
}
