//! `wc -l` as an independent oracle for the counters.

use crate::error::{LineCountError, Result};
use std::path::Path;
use std::process::Command;

pub fn count_lines_wc(path: &Path) -> Result<u64> {
    let output = Command::new("wc")
        .arg("-l")
        .arg(path)
        .output()
        .map_err(|e| LineCountError::Reference(format!("failed to run wc: {e}")))?;

    if !output.status.success() {
        return Err(LineCountError::Reference(format!(
            "wc exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    parse_wc_output(&String::from_utf8_lossy(&output.stdout))
}

fn parse_wc_output(stdout: &str) -> Result<u64> {
    stdout
        .split_whitespace()
        .next()
        .and_then(|count| count.parse().ok())
        .ok_or_else(|| LineCountError::Reference(format!("unexpected wc output: {stdout:?}")))
}
