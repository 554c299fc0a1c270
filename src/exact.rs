use crate::error::{self, Result};
use crate::{count_newlines, BUFFER_SIZE};
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Counts newline bytes in `path` with a single forward pass of unbuffered
/// 64 KiB reads. A final line without a terminator is not counted.
pub fn count_lines_exact(path: &Path) -> Result<u64> {
    let mut file = error::open(path)?;
    let count = count_lines_exact_reader(&mut file)?;
    debug!(path = %path.display(), count, "exact count");
    Ok(count)
}

pub fn count_lines_exact_reader<R: Read + ?Sized>(reader: &mut R) -> Result<u64> {
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut count = 0;

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        count += count_newlines(&buffer[..bytes_read]);
    }

    Ok(count)
}
