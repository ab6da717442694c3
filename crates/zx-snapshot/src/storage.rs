use std::io::{self, ErrorKind, Read, Write};
use std::time::Duration;

use crate::error::{Result, SnapshotError};
use crate::format::{PageHeader, PAGE_HEADER_LEN};
use crate::SnapshotOptions;

/// Sequential block storage the snapshot is streamed through.
///
/// `read` and `write` return how many bytes were actually transferred; anything other than the
/// requested count (except a zero-length read at a record boundary) fails the snapshot call.
pub trait BlockStorage {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Whether the device is still completing the previous transfer. No transfer may be issued
    /// while this returns `true`.
    fn is_busy(&mut self) -> bool {
        false
    }

    fn delay(&mut self, interval: Duration) {
        std::thread::sleep(interval);
    }
}

/// [`BlockStorage`] over any byte stream (files, cursors). Never busy.
#[derive(Debug)]
pub struct StreamStorage<T> {
    inner: T,
}

impl<T> StreamStorage<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read + Write> BlockStorage for StreamStorage<T> {
    /// Fills `buf` unless the stream ends first.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write_all(buf)?;
        Ok(buf.len())
    }
}

fn wait_until_ready<S: BlockStorage + ?Sized>(storage: &mut S, options: &SnapshotOptions) {
    while storage.is_busy() {
        storage.delay(options.busy_poll_interval);
    }
}

/// Reads exactly `buf.len()` bytes in transfer-unit chunks.
pub(crate) fn read_chunked<S: BlockStorage + ?Sized>(
    storage: &mut S,
    buf: &mut [u8],
    options: &SnapshotOptions,
) -> Result<()> {
    for chunk in buf.chunks_mut(options.transfer_unit) {
        let n = storage.read(chunk)?;
        wait_until_ready(storage, options);
        if n != chunk.len() {
            return Err(SnapshotError::ShortTransfer {
                expected: chunk.len(),
                actual: n,
            });
        }
    }
    Ok(())
}

/// Writes all of `buf` in transfer-unit chunks.
pub(crate) fn write_chunked<S: BlockStorage + ?Sized>(
    storage: &mut S,
    buf: &[u8],
    options: &SnapshotOptions,
) -> Result<()> {
    for chunk in buf.chunks(options.transfer_unit) {
        let n = storage.write(chunk)?;
        wait_until_ready(storage, options);
        if n != chunk.len() {
            return Err(SnapshotError::ShortTransfer {
                expected: chunk.len(),
                actual: n,
            });
        }
    }
    Ok(())
}

/// Reads `len` bytes through `scratch`, handing each filled piece to `consume`. `scratch` must be
/// non-empty.
pub(crate) fn read_chunks<S, F>(
    storage: &mut S,
    mut len: usize,
    scratch: &mut [u8],
    options: &SnapshotOptions,
    mut consume: F,
) -> Result<()>
where
    S: BlockStorage + ?Sized,
    F: FnMut(&[u8]),
{
    while len > 0 {
        let cap = scratch.len();
        let piece = &mut scratch[..len.min(cap)];
        read_chunked(storage, piece, options)?;
        consume(piece);
        len -= piece.len();
    }
    Ok(())
}

/// Reads and discards `len` bytes using `scratch` as the landing buffer.
pub(crate) fn skip_chunked<S: BlockStorage + ?Sized>(
    storage: &mut S,
    len: usize,
    scratch: &mut [u8],
    options: &SnapshotOptions,
) -> Result<()> {
    read_chunks(storage, len, scratch, options, |_| {})
}

/// Reads the next page record header. `Ok(None)` marks the end of the page list: either the
/// stream ended cleanly or a zero-length record was found.
pub(crate) fn read_page_header<S: BlockStorage + ?Sized>(
    storage: &mut S,
    options: &SnapshotOptions,
) -> Result<Option<PageHeader>> {
    let mut bytes = [0u8; PAGE_HEADER_LEN];
    let n = storage.read(&mut bytes)?;
    wait_until_ready(storage, options);
    match n {
        0 => Ok(None),
        PAGE_HEADER_LEN => {
            let header = PageHeader::from_bytes(bytes);
            Ok((header.stored_len != 0).then_some(header))
        }
        actual => Err(SnapshotError::ShortTransfer {
            expected: PAGE_HEADER_LEN,
            actual,
        }),
    }
}
