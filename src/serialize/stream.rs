//! Controls bridging a byte buffer to `std::io` streams

use std::io::{self, Read, Write};

use log::trace;

use super::{
    byte_buffer::ByteBuffer,
    control::{DeserializableControl, SerializableControl},
};
use crate::error::{PvError, Result};

/// Serialization control draining into an [`io::Write`].
///
/// With the direct path enabled, bulk payloads skip the buffer: pending bytes
/// are flushed first, then the payload is written as is.
#[derive(Debug)]
pub struct StreamWriter<W: Write> {
    writer: W,
    direct: bool,
    bytes_written: u64,
    flushes: u64,
}

impl<W: Write> StreamWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            direct: false,
            bytes_written: 0,
            flushes: 0,
        }
    }

    /// Enable or disable the direct bulk path
    pub fn with_direct(mut self, direct: bool) -> Self {
        self.direct = direct;
        self
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Number of buffer flushes so far
    pub fn flushes(&self) -> u64 {
        self.flushes
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Flush the buffer and the underlying writer
    pub fn finish(&mut self, buffer: &mut ByteBuffer) -> Result<()> {
        self.flush_serialize_buffer(buffer)?;
        self.writer
            .flush()
            .map_err(|err| PvError::from_io(err, "flushing stream"))
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer
            .write_all(bytes)
            .map_err(|err| PvError::from_io(err, "writing stream"))?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }
}

impl<W: Write> SerializableControl for StreamWriter<W> {
    fn flush_serialize_buffer(&mut self, buffer: &mut ByteBuffer) -> Result<()> {
        buffer.flip();
        let pending = buffer.remaining();
        if pending > 0 {
            let result = self.write(buffer.as_slice());
            buffer.clear();
            result?;
        } else {
            buffer.clear();
        }
        self.flushes += 1;
        Ok(())
    }

    fn direct_serialize(
        &mut self,
        buffer: &mut ByteBuffer,
        bytes: &[u8],
        element_size: usize,
    ) -> Result<bool> {
        if !self.direct {
            return Ok(false);
        }
        trace!(
            "direct write of {} elements of {} bytes",
            bytes.len() / element_size.max(1),
            element_size
        );
        self.flush_serialize_buffer(buffer)?;
        self.write(bytes)?;
        Ok(true)
    }
}

/// Deserialization control refilling from an [`io::Read`].
///
/// Each refill reads at most `fragment` bytes, so small fragments exercise
/// payloads split at arbitrary points. A read buffer starts out empty: create
/// it with [`ByteBuffer::new`] and call [`ByteBuffer::flip`] once.
#[derive(Debug)]
pub struct StreamReader<R: Read> {
    reader: R,
    fragment: usize,
    direct: bool,
    bytes_read: u64,
    refills: u64,
}

impl<R: Read> StreamReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            fragment: usize::MAX,
            direct: false,
            bytes_read: 0,
            refills: 0,
        }
    }

    /// Read at most `fragment` bytes per refill
    pub fn with_fragment(mut self, fragment: usize) -> Self {
        self.fragment = fragment.max(1);
        self
    }

    /// Enable or disable the direct bulk path
    pub fn with_direct(mut self, direct: bool) -> Self {
        self.direct = direct;
        self
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Number of refills so far
    pub fn refills(&self) -> u64 {
        self.refills
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read one fragment into the buffer; returns the bytes added
    fn refill(&mut self, buffer: &mut ByteBuffer) -> Result<usize> {
        buffer.compact();
        let space = buffer.as_mut_slice();
        let take = space.len().min(self.fragment);
        let result = loop {
            match self.reader.read(&mut space[..take]) {
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                other => break other,
            }
        };
        let count = match result {
            Ok(count) => count,
            Err(err) => {
                buffer.flip();
                return Err(PvError::from_io(err, "reading stream"));
            }
        };
        buffer.advance(count)?;
        buffer.flip();
        self.bytes_read += count as u64;
        self.refills += 1;
        Ok(count)
    }
}

impl<R: Read> DeserializableControl for StreamReader<R> {
    fn ensure_data(&mut self, buffer: &mut ByteBuffer, size: usize) -> Result<()> {
        let remaining = buffer.remaining();
        let target = remaining.saturating_add(size).min(buffer.capacity());
        if size > 0 && target <= remaining {
            return Err(PvError::insufficient_space(
                remaining + size,
                buffer.capacity(),
            ));
        }

        while buffer.remaining() < target {
            if self.refill(buffer)? == 0 {
                return Err(PvError::from_io(
                    io::Error::new(io::ErrorKind::UnexpectedEof, "stream ended mid-payload"),
                    "reading stream",
                ));
            }
        }
        Ok(())
    }

    fn direct_deserialize(
        &mut self,
        buffer: &mut ByteBuffer,
        dest: &mut [u8],
        element_size: usize,
    ) -> Result<bool> {
        if !self.direct {
            return Ok(false);
        }
        trace!(
            "direct read of {} elements of {} bytes",
            dest.len() / element_size.max(1),
            element_size
        );

        let buffered = buffer.remaining().min(dest.len());
        buffer.get_bytes(&mut dest[..buffered])?;
        self.reader
            .read_exact(&mut dest[buffered..])
            .map_err(|err| PvError::from_io(err, "reading stream"))?;
        self.bytes_read += (dest.len() - buffered) as u64;
        Ok(true)
    }
}
