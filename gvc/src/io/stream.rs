//! Byte stream adapters

use std::io::{self, ErrorKind, Read, Seek, SeekFrom};

/// Size of the scratch buffer used when skipping by reading.
const SKIP_CHUNK: usize = 512;

/// A byte stream frames can be read from.
pub trait ByteSource: Read {
    /// Advance past `count` bytes of input.
    ///
    /// Returns how many bytes were actually skipped, which is less than
    /// `count` only if the input ran out.
    fn skip(&mut self, count: u64) -> io::Result<u64>;
}

/// A stream that can seek forward, falling back to reading if a seek fails.
pub struct Seekable<R>(pub R);

/// A stream which can only be skipped by reading and discarding.
pub struct Unseekable<R>(pub R);

impl<R> Read for Seekable<R>
where
    R: Read,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl<R> ByteSource for Seekable<R>
where
    R: Read + Seek,
{
    fn skip(&mut self, count: u64) -> io::Result<u64> {
        let start = match self.0.stream_position() {
            Ok(start) => start,
            Err(_) => return consume(&mut self.0, count),
        };

        match seek_forward(&mut self.0, start, count) {
            Ok(skipped) => Ok(skipped),
            Err(_) => {
                // Undo whatever the failed seek moved.
                self.0.seek(SeekFrom::Start(start))?;
                consume(&mut self.0, count)
            }
        }
    }
}

impl<R> Read for Unseekable<R>
where
    R: Read,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl<R> ByteSource for Unseekable<R>
where
    R: Read,
{
    fn skip(&mut self, count: u64) -> io::Result<u64> {
        consume(&mut self.0, count)
    }
}

/// Seek `count` bytes forward from `start`, stopping at the end of the stream.
fn seek_forward<S>(stream: &mut S, start: u64, count: u64) -> io::Result<u64>
where
    S: Seek,
{
    let end = stream.seek(SeekFrom::End(0))?.max(start);
    let target = start.saturating_add(count).min(end);
    stream.seek(SeekFrom::Start(target))?;

    Ok(target - start)
}

/// Read and discard `count` bytes, a chunk at a time.
fn consume<R>(reader: &mut R, count: u64) -> io::Result<u64>
where
    R: Read + ?Sized,
{
    let mut chunk = [0; SKIP_CHUNK];
    let mut skipped = 0;

    while skipped < count {
        let want = (count - skipped).min(SKIP_CHUNK as u64) as usize;
        let got = fill(reader, &mut chunk[..want])?;
        skipped += got as u64;

        if got < want {
            break;
        }
    }

    Ok(skipped)
}

/// Read until `buf` is full or the input runs out.
///
/// Returns how many bytes were read.
pub fn fill<R>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize>
where
    R: Read + ?Sized,
{
    let mut filled = 0;

    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(filled)
}
