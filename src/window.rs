//! Circular reads over a file: a window that runs past the end of the file
//! continues at offset 0.

use crate::error::{LineCountError, Result};
use std::io::{self, Read, Seek, SeekFrom};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircularWindow {
    start: u64,
    len: u64,
    file_size: u64,
}

impl CircularWindow {
    /// `start` is taken modulo `file_size`.
    pub fn new(start: u64, len: u64, file_size: u64) -> Result<Self> {
        if file_size == 0 {
            if len > 0 {
                return Err(LineCountError::InvalidParameters(format!(
                    "cannot read {len} bytes from an empty file"
                )));
            }
            return Ok(Self {
                start: 0,
                len: 0,
                file_size,
            });
        }

        Ok(Self {
            start: start % file_size,
            len,
            file_size,
        })
    }

    /// File ranges covering the window in read order. Two ranges when the
    /// window wraps once, more when it is longer than the file.
    pub fn segments(&self) -> Vec<Range<u64>> {
        let mut segments = Vec::with_capacity(2);
        let mut offset = self.start;
        let mut remaining = self.len;

        while remaining > 0 {
            let take = remaining.min(self.file_size - offset);
            segments.push(offset..offset + take);
            remaining -= take;
            offset = 0;
        }

        segments
    }

    /// Fills `buf` with the window's bytes. `buf.len()` must equal the
    /// window length.
    pub fn read_into<R: Read + Seek + ?Sized>(
        &self,
        reader: &mut R,
        buf: &mut [u8],
    ) -> Result<()> {
        if buf.len() as u64 != self.len {
            return Err(LineCountError::InvalidParameters(format!(
                "buffer of {} bytes for a {} byte window",
                buf.len(),
                self.len
            )));
        }

        let mut filled = 0;
        for segment in self.segments() {
            let seg_len = (segment.end - segment.start) as usize;
            reader.seek(SeekFrom::Start(segment.start))?;
            read_full(reader, &mut buf[filled..filled + seg_len], segment.start)?;
            filled += seg_len;
        }

        Ok(())
    }

    #[cfg(test)]
    fn read<R: Read + Seek + ?Sized>(&self, reader: &mut R) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.len as usize];
        self.read_into(reader, &mut buf)?;
        Ok(buf)
    }
}

// A zero-length read before the segment is full means the file shrank
// after its size was taken.
fn read_full<R: Read + ?Sized>(reader: &mut R, mut buf: &mut [u8], offset: u64) -> Result<()> {
    let wanted = buf.len();
    while !buf.is_empty() {
        match reader.read(buf) {
            Ok(0) => {
                return Err(LineCountError::ReadFailure(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "file ended {} bytes into a {wanted} byte read at offset {offset}",
                        wanted - buf.len()
                    ),
                )))
            }
            Ok(n) => buf = &mut buf[n..],
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
