//! Synthetic test files: `n_lines` lines of `x` whose byte lengths are drawn
//! uniformly from a range.

use crate::error::{LineCountError, Result};
use rand::Rng;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::RangeInclusive;
use std::path::Path;
use tracing::debug;

const FILL: u8 = b'x';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    pub n_lines: u64,
    /// Bytes per line, not counting the newline.
    pub line_len: RangeInclusive<usize>,
    pub final_newline: bool,
}

impl FileSpec {
    pub fn new(n_lines: u64, line_len: RangeInclusive<usize>) -> Self {
        Self {
            n_lines,
            line_len,
            final_newline: true,
        }
    }

    pub fn without_final_newline(mut self) -> Self {
        self.final_newline = false;
        self
    }

    /// Newline bytes a file built from this spec contains.
    pub fn expected_newlines(&self) -> u64 {
        match (self.n_lines, self.final_newline) {
            (0, _) => 0,
            (n, true) => n,
            (n, false) => n - 1,
        }
    }
}

/// Writes a file for `spec` to `writer` and returns the bytes written.
pub fn write_lines<W: Write, R: Rng + ?Sized>(
    writer: &mut W,
    spec: &FileSpec,
    rng: &mut R,
) -> Result<u64> {
    if spec.line_len.is_empty() {
        return Err(LineCountError::InvalidParameters(format!(
            "empty line length range {:?}",
            spec.line_len
        )));
    }

    let longest = vec![FILL; *spec.line_len.end()];
    let mut written = 0u64;

    for i in 0..spec.n_lines {
        let len = rng.gen_range(spec.line_len.clone());
        writer.write_all(&longest[..len])?;
        written += len as u64;

        let last = i + 1 == spec.n_lines;
        if !last || spec.final_newline {
            writer.write_all(b"\n")?;
            written += 1;
        }
    }

    Ok(written)
}

pub fn make_file<R: Rng + ?Sized>(path: &Path, spec: &FileSpec, rng: &mut R) -> Result<u64> {
    let file = File::create(path).map_err(|e| LineCountError::from_path(path, e))?;
    let mut writer = BufWriter::new(file);
    let written = write_lines(&mut writer, spec, rng)?;
    writer.flush()?;
    debug!(path = %path.display(), n_lines = spec.n_lines, written, "generated file");
    Ok(written)
}
