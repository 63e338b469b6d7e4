//! Byte-offset tracking for streaming parsers.
//!
//! A tokenizer reads ahead of the token it reports, so the number of bytes
//! pulled from a source over-reports where the current token ends. The
//! types here keep the two numbers needed to undo that: how many bytes were
//! handed to the consumer's buffer fills, and how many of those it has not
//! consumed yet.

use crate::error::Result;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::{self, BufRead, Read};

const DEFAULT_CAPACITY: usize = 8 * 1024;

/// Offset arithmetic shared by every tracking layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OffsetCounter {
    base: u64,
    delivered: u64,
}

impl OffsetCounter {
    pub const fn new(base: u64) -> Self {
        OffsetCounter { base, delivered: 0 }
    }

    /// Note that a buffer fill handed `n` more bytes to the consumer.
    pub fn record(&mut self, n: usize) {
        self.delivered += n as u64;
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Absolute offset of the consumer's position, given how many delivered
    /// bytes are still sitting unconsumed in its buffer.
    pub fn offset_of(&self, unconsumed: usize) -> u64 {
        self.base + self.delivered - unconsumed as u64
    }
}

/// Buffered reader that knows the absolute offset of the next byte its
/// consumer will see.
pub struct TrackingReader<R> {
    inner: R,
    buf: Box<[u8]>,
    pos: usize,
    filled: usize,
    counter: OffsetCounter,
}

impl<R: Read> TrackingReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_base(inner, 0)
    }

    /// Report offsets relative to `base`, i.e. in the coordinates of the file
    /// the stream was cut from.
    pub fn with_base(inner: R, base: u64) -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, inner, base)
    }

    pub fn with_capacity(capacity: usize, inner: R, base: u64) -> Self {
        TrackingReader {
            inner,
            buf: vec![0u8; capacity.max(1)].into_boxed_slice(),
            pos: 0,
            filled: 0,
            counter: OffsetCounter::new(base),
        }
    }

    /// Absolute offset of the first byte not yet consumed.
    pub fn offset(&self) -> u64 {
        self.counter.offset_of(self.filled - self.pos)
    }

    /// Offset as seen by a consumer that still holds `unconsumed` bytes it
    /// already read from this tracker in a buffer of its own.
    pub fn offset_of(&self, unconsumed: usize) -> u64 {
        self.offset() - unconsumed as u64
    }

    /// Raw number of bytes pulled from the inner source so far.
    pub fn delivered(&self) -> u64 {
        self.counter.delivered()
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for TrackingReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.pos == self.filled && out.len() >= self.buf.len() {
            let n = self.inner.read(out)?;
            self.counter.record(n);
            return Ok(n);
        }
        let available = self.fill_buf()?;
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl<R: Read> BufRead for TrackingReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.pos >= self.filled {
            let n = loop {
                match self.inner.read(&mut self.buf) {
                    Ok(n) => break n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                }
            };
            self.counter.record(n);
            self.pos = 0;
            self.filled = n;
        }
        Ok(&self.buf[self.pos..self.filled])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.filled);
    }
}

/// End offset of every START_TAG and END_TAG event in an XML stream.
///
/// A self-closing element yields the same offset twice, once for each
/// logical event.
pub fn token_offsets<R: Read>(source: R) -> Result<Vec<u64>> {
    tag_offsets(TrackingReader::new(source))
}

/// [`token_offsets`] over an already configured tracker.
pub fn tag_offsets<R: Read>(tracker: TrackingReader<R>) -> Result<Vec<u64>> {
    let mut reader = Reader::from_reader(tracker);
    let mut buf = Vec::new();
    let mut offsets = Vec::new();
    loop {
        let event = reader.read_event_into(&mut buf)?;
        let at = reader.get_ref().offset();
        match event {
            Event::Start(_) | Event::End(_) => offsets.push(at),
            Event::Empty(_) => offsets.extend([at, at]),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(offsets)
}
