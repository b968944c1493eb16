// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Row and watermark files.
//!
//! # Row file format
//!
//! ```text
//! +----------------+-------------------+-----+-------------------+
//! | count: i32 (NE)| row 0: 512 bytes  | ... | row n-1: 512 bytes|
//! +----------------+-------------------+-----+-------------------+
//! ```
//!
//! The count is native-endian: the file is only ever read back on the machine
//! that wrote it. The watermark file is a bare native-endian `u64`.
//!
//! Writes loop until every byte is on disk, retrying on `Interrupted` and
//! failing on any other error, a zero-length write included. Reads loop the
//! same way and treat an early end of file as a short read.
//!
//! The write functions run at crash time and emit no diagnostics. Reading
//! happens on the next launch and may log.

use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Read, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::PersistError;
use crate::record::{LogRow, LOG_ROW_LEN};

/// Size of the row-count header.
pub const ROW_HEADER_LEN: usize = std::mem::size_of::<i32>();

/// Size of the watermark file.
pub const WATERMARK_LEN: usize = std::mem::size_of::<u64>();

fn create(path: &Path) -> Result<File, PersistError> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    options.open(path).map_err(PersistError::Open)
}

fn open(path: &Path) -> Result<File, PersistError> {
    File::open(path).map_err(PersistError::Open)
}

/// Writes all of `buf`, retrying interrupted writes.
fn write_full<W: Write>(w: &mut W, mut buf: &[u8]) -> io::Result<()> {
    while !buf.is_empty() {
        match w.write(buf) {
            Ok(0) => return Err(io::Error::from(ErrorKind::WriteZero)),
            Ok(n) => buf = &buf[n..],
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Fills all of `buf`, retrying interrupted reads.
fn read_full<R: Read>(r: &mut R, mut buf: &mut [u8]) -> io::Result<()> {
    while !buf.is_empty() {
        match r.read(buf) {
            Ok(0) => return Err(io::Error::from(ErrorKind::UnexpectedEof)),
            Ok(n) => buf = &mut std::mem::take(&mut buf)[n..],
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Writes `rows` to `path`, replacing any previous file.
///
/// Returns the number of payload bytes written, header excluded.
pub fn write_rows(path: impl AsRef<Path>, rows: &[LogRow]) -> Result<usize, PersistError> {
    let count = i32::try_from(rows.len())
        .map_err(|_| PersistError::InvalidArgument("too many rows for the count header"))?;

    let mut file = create(path.as_ref())?;
    write_full(&mut file, &count.to_ne_bytes()).map_err(PersistError::Write)?;
    for row in rows {
        write_full(&mut file, row.as_bytes()).map_err(PersistError::Write)?;
    }
    Ok(rows.len() * LOG_ROW_LEN)
}

/// Writes the first `count` of `rows`.
///
/// A non-positive `count` writes nothing and leaves any existing file alone.
pub fn write_rows_counted(
    path: impl AsRef<Path>,
    rows: &[LogRow],
    count: i32,
) -> Result<usize, PersistError> {
    let Ok(count) = usize::try_from(count) else {
        return Ok(0);
    };
    if count == 0 {
        return Ok(0);
    }
    let rows = rows
        .get(..count)
        .ok_or(PersistError::InvalidArgument("count exceeds the rows supplied"))?;
    write_rows(path, rows)
}

/// Reads a row file into the front of `out` and returns the row count.
pub fn read_rows(path: impl AsRef<Path>, out: &mut [LogRow]) -> Result<usize, PersistError> {
    let path = path.as_ref();
    let mut file = open(path)?;

    let mut header = [0u8; ROW_HEADER_LEN];
    read_full(&mut file, &mut header).map_err(PersistError::ShortHeader)?;
    let count = i32::from_ne_bytes(header);
    let count = usize::try_from(count).map_err(|_| PersistError::InvalidHeader(count))?;

    if count > out.len() {
        warn!(
            "{} holds {} log rows but only {} fit",
            path.display(),
            count,
            out.len()
        );
        return Err(PersistError::CapacityExceeded {
            count,
            capacity: out.len(),
        });
    }

    for row in &mut out[..count] {
        read_full(&mut file, row.as_bytes_mut()).map_err(PersistError::ShortPayload)?;
    }
    debug!("Read {} log rows from {}", count, path.display());
    Ok(count)
}

/// Stores the last processed event time.
pub fn write_watermark(path: impl AsRef<Path>, value: u64) -> Result<usize, PersistError> {
    let mut file = create(path.as_ref())?;
    write_full(&mut file, &value.to_ne_bytes()).map_err(PersistError::Write)?;
    Ok(WATERMARK_LEN)
}

/// Loads the value stored by [`write_watermark`].
pub fn read_watermark(path: impl AsRef<Path>) -> Result<u64, PersistError> {
    let mut file = open(path.as_ref())?;
    let mut buf = [0u8; WATERMARK_LEN];
    read_full(&mut file, &mut buf).map_err(PersistError::ShortPayload)?;
    Ok(u64::from_ne_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use tempfile::tempdir;
    use tracing_test::traced_test;

    /// Replays scripted results: `Ok(n)` moves at most `n` bytes.
    #[derive(Default)]
    struct Scripted {
        steps: VecDeque<io::Result<usize>>,
        data: Vec<u8>,
        calls: usize,
    }

    impl Scripted {
        fn new(steps: impl IntoIterator<Item = io::Result<usize>>) -> Self {
            Self {
                steps: steps.into_iter().collect(),
                ..Default::default()
            }
        }

        fn with_data(mut self, data: &[u8]) -> Self {
            self.data = data.to_vec();
            self
        }

        fn next_step(&mut self, len: usize) -> io::Result<usize> {
            self.calls += 1;
            match self.steps.pop_front() {
                Some(Ok(n)) => Ok(n.min(len)),
                Some(Err(e)) => Err(e),
                None => Ok(len),
            }
        }
    }

    impl Write for Scripted {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = self.next_step(buf.len())?;
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.next_step(buf.len())?.min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data.drain(..n);
            Ok(n)
        }
    }

    fn interrupted() -> io::Result<usize> {
        Err(io::Error::from(ErrorKind::Interrupted))
    }

    fn failed() -> io::Result<usize> {
        Err(io::Error::other("device gone"))
    }

    #[test]
    fn test_write_full_retries_interrupted_and_partial() {
        let mut w = Scripted::new([interrupted(), Ok(3), interrupted(), Ok(2)]);
        write_full(&mut w, b"abcdefghij").unwrap();
        assert_eq!(w.data, b"abcdefghij");
        assert_eq!(w.calls, 5);
    }

    #[test]
    fn test_write_full_fails_without_retry() {
        let mut w = Scripted::new([failed(), Ok(10)]);
        let err = write_full(&mut w, b"abcdefghij").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(w.calls, 1);
        assert!(w.data.is_empty());
    }

    #[test]
    fn test_write_full_zero_length_write() {
        let mut w = Scripted::new([Ok(4), Ok(0), Ok(10)]);
        let err = write_full(&mut w, b"abcdefghij").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WriteZero);
        assert_eq!(w.calls, 2);
    }

    #[test]
    fn test_read_full_retries_interrupted_and_partial() {
        let mut r = Scripted::new([Ok(1), interrupted(), Ok(2), interrupted()])
            .with_data(b"abcdefgh");
        let mut buf = [0u8; 6];
        read_full(&mut r, &mut buf).unwrap();
        assert_eq!(&buf, b"abcdef");
        assert_eq!(r.calls, 5);
    }

    #[test]
    fn test_read_full_fails_without_retry() {
        let mut r = Scripted::new([Ok(2), failed()]).with_data(b"abcdefgh");
        let mut buf = [0u8; 6];
        let err = read_full(&mut r, &mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(r.calls, 2);
    }

    #[test]
    fn test_read_full_early_eof() {
        let mut r = Scripted::default().with_data(b"abc");
        let mut buf = [0u8; 6];
        let err = read_full(&mut r, &mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    #[traced_test]
    fn test_writes_emit_no_diagnostics() {
        let dir = tempdir().unwrap();
        write_rows(dir.path().join("rows.bin"), &rows(&["a", "b"])).unwrap();
        write_rows_counted(dir.path().join("rows.bin"), &rows(&["c"]), 1).unwrap();
        write_watermark(dir.path().join("watermark"), 42).unwrap();

        logs_assert(|lines: &[&str]| match lines.len() {
            0 => Ok(()),
            n => Err(format!("{n} lines logged while writing")),
        });
    }

    fn rows(texts: &[&str]) -> Vec<LogRow> {
        texts.iter().map(|t| LogRow::from_text(t.as_bytes())).collect()
    }

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.bin");
        let written = rows(&["...", "first", "second"]);

        assert_eq!(write_rows(&path, &written).unwrap(), 3 * LOG_ROW_LEN);
        assert_eq!(
            std::fs::metadata(&path).unwrap().len() as usize,
            ROW_HEADER_LEN + 3 * LOG_ROW_LEN
        );

        let mut out = vec![LogRow::EMPTY; 10];
        assert_eq!(read_rows(&path, &mut out).unwrap(), 3);
        assert_eq!(&out[..3], &written[..]);
        assert_eq!(out[3], LogRow::EMPTY);
    }

    #[test]
    fn test_empty_rows_write_zero_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.bin");

        assert_eq!(write_rows(&path, &[]).unwrap(), 0);
        let mut out = vec![LogRow::EMPTY; 1];
        assert_eq!(read_rows(&path, &mut out).unwrap(), 0);
    }

    #[test]
    fn test_counted_write_skips_non_positive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.bin");
        let data = rows(&["a"]);

        assert_eq!(write_rows_counted(&path, &data, 0).unwrap(), 0);
        assert_eq!(write_rows_counted(&path, &data, -4).unwrap(), 0);
        assert!(!path.exists());

        assert_eq!(write_rows_counted(&path, &data, 1).unwrap(), LOG_ROW_LEN);
        assert!(matches!(
            write_rows_counted(&path, &data, 2),
            Err(PersistError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = read_rows(dir.path().join("absent"), &mut [LogRow::EMPTY]).unwrap_err();
        assert_eq!(err.code(), PersistError::OPEN_FAILED);
        assert!(err.is_not_found());
    }

    #[test]
    fn test_short_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.bin");
        std::fs::write(&path, [1u8, 0]).unwrap();

        let err = read_rows(&path, &mut [LogRow::EMPTY]).unwrap_err();
        assert_eq!(err.code(), PersistError::HEADER_FAILED);
    }

    #[test]
    fn test_negative_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.bin");
        std::fs::write(&path, (-1i32).to_ne_bytes()).unwrap();

        let err = read_rows(&path, &mut [LogRow::EMPTY]).unwrap_err();
        assert!(matches!(err, PersistError::InvalidHeader(-1)));
    }

    #[test]
    fn test_short_payload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.bin");
        let mut bytes = 2i32.to_ne_bytes().to_vec();
        bytes.extend_from_slice(&[b'x'; LOG_ROW_LEN + 10]);
        std::fs::write(&path, bytes).unwrap();

        let mut out = vec![LogRow::EMPTY; 4];
        let err = read_rows(&path, &mut out).unwrap_err();
        assert_eq!(err.code(), PersistError::PAYLOAD_FAILED);
    }

    #[test]
    fn test_capacity_exceeded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.bin");
        write_rows(&path, &rows(&["a", "b", "c"])).unwrap();

        let mut out = vec![LogRow::EMPTY; 2];
        let err = read_rows(&path, &mut out).unwrap_err();
        assert_eq!(err.code(), PersistError::CAPACITY_EXCEEDED);
        assert_eq!(out, vec![LogRow::EMPTY; 2]);
    }

    #[test]
    fn test_rewrite_truncates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.bin");
        write_rows(&path, &rows(&["a", "b", "c"])).unwrap();
        write_rows(&path, &rows(&["z"])).unwrap();

        assert_eq!(
            std::fs::metadata(&path).unwrap().len() as usize,
            ROW_HEADER_LEN + LOG_ROW_LEN
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.bin");
        write_rows(&path, &rows(&["a"])).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        // umask can only clear bits
        assert_eq!(mode & 0o133, 0);
    }

    #[test]
    fn test_watermark() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("watermark");

        assert!(read_watermark(&path).unwrap_err().is_not_found());
        assert_eq!(write_watermark(&path, 1_709_210_096).unwrap(), WATERMARK_LEN);
        assert_eq!(read_watermark(&path).unwrap(), 1_709_210_096);

        std::fs::write(&path, [7u8; 3]).unwrap();
        assert_eq!(
            read_watermark(&path).unwrap_err().code(),
            PersistError::PAYLOAD_FAILED
        );
    }
}
