use std::io::{ErrorKind, Read, Seek, SeekFrom};

/// Seekable byte source used by the chunk scanner and the frame replay.
///
/// Unlike `Read::read_exact`, short reads at the end of the stream are reported as a byte count
/// rather than an error, so callers can tell truncation apart from I/O failure.
#[derive(Debug)]
pub struct ByteReader<R: Read + Seek> {
    reader: R,
}

impl<R: Read + Seek> ByteReader<R> {
    pub fn new(reader: R) -> Self {
        ByteReader { reader }
    }

    /// Fills as much of `buf` as the stream allows.
    ///
    /// # Returns
    /// - The number of bytes read; less than `buf.len()` only at end of stream
    /// - `std::io::Error` if an I/O error occurs
    pub fn read_up_to(&mut self, buf: &mut [u8]) -> Result<usize, std::io::Error> {
        let mut filled = 0;

        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(filled)
    }

    /// Seeks to an absolute offset from the start of the stream.
    pub fn seek_to(&mut self, offset: u64) -> Result<(), std::io::Error> {
        self.reader.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    pub fn position(&mut self) -> Result<u64, std::io::Error> {
        self.reader.stream_position()
    }

    /// Total stream length. The current position is preserved.
    pub fn stream_len(&mut self) -> Result<u64, std::io::Error> {
        let current = self.reader.stream_position()?;
        let len = self.reader.seek(SeekFrom::End(0))?;
        self.reader.seek(SeekFrom::Start(current))?;
        Ok(len)
    }

    /// Reads exactly `len` bytes starting at `offset`, returning fewer if the stream ends.
    pub fn read_span(&mut self, offset: u64, len: usize) -> Result<Vec<u8>, std::io::Error> {
        self.seek_to(offset)?;
        let mut buf = vec![0u8; len];
        let read = self.read_up_to(&mut buf)?;
        buf.truncate(read);
        Ok(buf)
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}
