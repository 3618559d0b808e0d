//! Streaming access to the input file
//!
//! Both passes open the file themselves and drop the handle on return, so
//! the file is never held open across stages.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::domain::record::trim_line_ending;
use crate::domain::CancellationToken;

/// Read buffer for both passes
const READ_BUFFER_BYTES: usize = 1 << 20;

/// UTF-8 byte order mark, skipped at the start of the input
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Result of the counting pass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineCount {
    /// Records seen (all of them, unless canceled)
    pub lines: u64,
    /// Cancellation was observed before the end of the file
    pub canceled: bool,
}

/// Count the records in `path` without holding more than one buffer in memory
///
/// A final line without a trailing newline counts as a record. The token is
/// checked each time the running count crosses a multiple of
/// `check_interval`.
pub fn count_lines(
    path: &Path,
    check_interval: u64,
    cancel: &CancellationToken,
) -> io::Result<LineCount> {
    let file = File::open(path)?;
    count_records(
        BufReader::with_capacity(READ_BUFFER_BYTES, file),
        check_interval,
        cancel,
    )
}

/// Count newline-terminated records in any buffered reader
pub fn count_records<R: BufRead>(
    mut reader: R,
    check_interval: u64,
    cancel: &CancellationToken,
) -> io::Result<LineCount> {
    let check_interval = check_interval.max(1);
    let mut lines = 0u64;
    let mut next_check = check_interval;
    let mut unterminated = false;

    loop {
        let chunk = match reader.fill_buf() {
            Ok([]) => break,
            Ok(chunk) => chunk,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        let len = chunk.len();
        lines += chunk.iter().filter(|&&b| b == b'\n').count() as u64;
        unterminated = chunk[len - 1] != b'\n';
        reader.consume(len);

        if lines >= next_check {
            if cancel.is_cancelled() {
                return Ok(LineCount {
                    lines,
                    canceled: true,
                });
            }
            next_check = (lines / check_interval + 1) * check_interval;
        }
    }

    if unterminated {
        lines += 1;
    }

    Ok(LineCount {
        lines,
        canceled: false,
    })
}

/// Line-at-a-time reader for the insertion pass
///
/// Reuses one buffer for every line; records borrow from it. A UTF-8 byte
/// order mark before the first record is dropped.
pub struct RecordReader<R> {
    reader: R,
    buf: Vec<u8>,
    at_start: bool,
}

impl RecordReader<BufReader<File>> {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::with_capacity(READ_BUFFER_BYTES, file)))
    }
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(128),
            at_start: true,
        }
    }

    /// Next record without its line ending, or `None` at end of file
    pub fn next_record(&mut self) -> io::Result<Option<&[u8]>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        let first = std::mem::take(&mut self.at_start);
        let line = trim_line_ending(&self.buf);
        if first {
            return Ok(Some(line.strip_prefix(UTF8_BOM).unwrap_or(line)));
        }
        Ok(Some(line))
    }
}
