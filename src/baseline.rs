//! Exact full-scan counters used as baselines for the estimator. Each one
//! reads the whole file through a different I/O path.

use crate::error::{self, Result};
use crate::{count_newlines, BUFFER_SIZE};
use io_uring::{opcode, types, IoUring};
use memmap2::{Advice, Mmap, MmapMut};
use std::fs::File;
use std::io::{self, BufRead, BufReader, IoSliceMut, Read};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;

const NUM_BUFFERS: usize = 64;
const RING_ENTRIES: u32 = 8;

/// Counts text lines through a buffered reader. Unlike the newline counters
/// this includes a final line that has no terminator.
pub fn count_lines_buffered(path: &Path) -> Result<u64> {
    let file = error::open(path)?;
    let reader = BufReader::with_capacity(16 * 1024, file);

    let mut count = 0;
    for line in reader.split(b'\n') {
        line?;
        count += 1;
    }
    Ok(count)
}

pub fn count_newlines_fill_buf(path: &Path) -> Result<u64> {
    let file = error::open(path)?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
    let mut newline_count = 0;

    loop {
        let len = {
            let buffer = reader.fill_buf()?;
            if buffer.is_empty() {
                break;
            }
            newline_count += count_newlines(buffer);
            buffer.len()
        };

        reader.consume(len);
    }

    Ok(newline_count)
}

/// Reads with `O_DIRECT`, bypassing the page cache. The buffer is an
/// anonymous mapping so it is page aligned as the kernel requires.
pub fn count_newlines_direct_io(path: &Path) -> Result<u64> {
    let mut open_options = File::options();
    open_options.read(true).custom_flags(libc::O_DIRECT);

    let mut file = open_options
        .open(path)
        .map_err(|e| error::LineCountError::from_path(path, e))?;
    let mut buffer = MmapMut::map_anon(BUFFER_SIZE)?;
    let mut newline_count = 0;

    loop {
        let bytes_read = file.read(&mut buffer[..])?;
        if bytes_read == 0 {
            break;
        }
        newline_count += count_newlines(&buffer[..bytes_read]);
    }

    Ok(newline_count)
}

fn map_file(path: &Path) -> Result<Option<Mmap>> {
    let file = error::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(None);
    }
    // SAFETY: the map is read-only and dropped before returning; a
    // concurrent truncation would fault, as with any mmap reader.
    let mmap = unsafe { Mmap::map(&file)? };
    mmap.advise(Advice::Sequential)?;
    Ok(Some(mmap))
}

pub fn count_newlines_memmap(path: &Path) -> Result<u64> {
    Ok(map_file(path)?.map_or(0, |mmap| count_newlines(&mmap)))
}

/// Memory-mapped scan using AVX2 compares when the CPU has them.
pub fn count_newlines_memmap_simd(path: &Path) -> Result<u64> {
    Ok(map_file(path)?.map_or(0, |mmap| simd::count_newlines(&mmap)))
}

pub fn count_newlines_vectored_io(path: &Path) -> Result<u64> {
    let mut file = error::open(path)?;

    let mut backing: Vec<_> = (0..NUM_BUFFERS).map(|_| vec![0u8; BUFFER_SIZE]).collect();
    let mut buffers: Vec<_> = backing.iter_mut().map(|buf| IoSliceMut::new(buf)).collect();

    let mut newline_count = 0;

    loop {
        let bytes_read = match file.read_vectored(&mut buffers) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        // Buffers are filled in order; the last one may be partial.
        let filled_buffers = bytes_read / BUFFER_SIZE;
        for buf in &buffers[..filled_buffers] {
            newline_count += count_newlines(buf);
        }

        let end = bytes_read % BUFFER_SIZE;
        if end > 0 {
            newline_count += count_newlines(&buffers[filled_buffers][..end]);
        }
    }

    Ok(newline_count)
}

/// Sequential reads submitted through an io_uring, one read in flight.
pub fn count_newlines_io_uring(path: &Path) -> Result<u64> {
    let file = error::open(path)?;
    let fd = file.as_raw_fd();

    let mut ring = IoUring::new(RING_ENTRIES)?;
    let mut buf = vec![0u8; BUFFER_SIZE];
    let mut newline_count = 0;
    let mut offset: u64 = 0;

    loop {
        let sqe = opcode::Read::new(types::Fd(fd), buf.as_mut_ptr(), buf.len() as _)
            .offset(offset as _)
            .build()
            .user_data(offset);

        // SAFETY: `buf` outlives the request, which completes before the
        // next loop iteration touches it.
        unsafe {
            ring.submission()
                .push(&sqe)
                .map_err(|_| io::Error::new(io::ErrorKind::Other, "submission queue is full"))?;
        }

        ring.submit_and_wait(1)?;

        let cqe = ring
            .completion()
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "completion queue is empty"))?;

        let result = cqe.result();
        if result < 0 {
            return Err(io::Error::from_raw_os_error(-result).into());
        }
        let bytes_read = result as usize;
        if bytes_read == 0 {
            break;
        }

        newline_count += count_newlines(&buf[..bytes_read]);
        offset += bytes_read as u64;
    }

    Ok(newline_count)
}

mod simd {
    #[cfg(target_arch = "x86_64")]
    use std::arch::x86_64::*;

    pub fn count_newlines(data: &[u8]) -> u64 {
        #[cfg(target_arch = "x86_64")]
        {
            if is_x86_feature_detected!("avx2") {
                // SAFETY: AVX2 support was just checked.
                return unsafe { count_newlines_avx2(data) };
            }
        }
        crate::count_newlines(data)
    }

    /// Sums the 32 unsigned bytes of `v`.
    #[cfg(target_arch = "x86_64")]
    #[target_feature(enable = "avx2")]
    pub(super) unsafe fn horizontal_sum(v: __m256i) -> u64 {
        let sums = _mm256_sad_epu8(v, _mm256_setzero_si256());
        let mut lanes = [0u64; 4];
        _mm256_storeu_si256(lanes.as_mut_ptr() as *mut __m256i, sums);
        lanes.iter().sum()
    }

    #[cfg(target_arch = "x86_64")]
    #[target_feature(enable = "avx2")]
    unsafe fn count_newlines_avx2(data: &[u8]) -> u64 {
        let newline_vector = _mm256_set1_epi8(crate::NEWLINE as i8);
        let ones_mask = _mm256_set1_epi8(1);

        let mut newline_count = 0;
        let mut running_sum = _mm256_setzero_si256();
        let mut iteration_count = 0u32;

        let mut blocks = data.chunks_exact(32);
        for block in &mut blocks {
            let bytes = _mm256_loadu_si256(block.as_ptr() as *const __m256i);
            let cmp_result = _mm256_cmpeq_epi8(bytes, newline_vector);
            running_sum = _mm256_add_epi8(running_sum, _mm256_and_si256(cmp_result, ones_mask));

            // Byte lanes saturate at 255 matches.
            iteration_count += 1;
            if iteration_count == 255 {
                newline_count += horizontal_sum(running_sum);
                running_sum = _mm256_setzero_si256();
                iteration_count = 0;
            }
        }

        newline_count += horizontal_sum(running_sum);
        newline_count + crate::count_newlines(blocks.remainder())
    }
}
