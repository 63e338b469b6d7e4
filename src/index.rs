use crate::boxes::{BoxKey, FourCC};
use crate::error::{Error, Result};
use crate::parser::collect_ranges;
use crate::range::{ByteRange, flatten};
use crate::util::{read_slice, stream_len};
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

/// On-demand index of the boxes in an ISOBMFF file.
///
/// Nothing is cached between queries: every lookup walks the box tree again
/// from the underlying reader.
#[derive(Debug)]
pub struct BoxIndex<R> {
    reader: R,
    len: u64,
}

impl BoxIndex<File> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        BoxIndex::new(File::open(path)?)
    }
}

impl<R: Read + Seek> BoxIndex<R> {
    pub fn new(mut reader: R) -> Result<Self> {
        let len = stream_len(&mut reader)?;
        Ok(BoxIndex { reader, len })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Payload ranges of every box matching `key`, at any depth, in file order.
    pub fn ranges(&mut self, key: &BoxKey) -> Result<Vec<ByteRange>> {
        let mut out = Vec::new();
        collect_ranges(&mut self.reader, 0, self.len, true, key, &mut out)?;
        tracing::debug!(key = %key, found = out.len(), "box query");
        Ok(out)
    }

    /// Payload ranges of every box of type `typ`.
    pub fn box_ranges(&mut self, typ: FourCC) -> Result<Vec<ByteRange>> {
        self.ranges(&BoxKey::FourCC(typ))
    }

    /// Same as [`box_ranges`](Self::box_ranges) flattened to
    /// `[start, end, start, end, ...]`.
    pub fn box_offsets(&mut self, typ: FourCC) -> Result<Vec<u64>> {
        Ok(flatten(&self.box_ranges(typ)?))
    }

    /// Payload ranges (after the extended type) of `uuid` boxes carrying `uuid`.
    pub fn uuid_ranges(&mut self, uuid: [u8; 16]) -> Result<Vec<ByteRange>> {
        self.ranges(&BoxKey::Uuid(uuid))
    }

    /// Search only the children of a container whose payload is `parent`.
    pub fn ranges_within(&mut self, parent: ByteRange, key: &BoxKey) -> Result<Vec<ByteRange>> {
        if parent.end > self.len || parent.start > parent.end {
            return Err(Error::RangeOutOfBounds {
                start: parent.start,
                end: parent.end,
                len: self.len,
            });
        }
        let mut out = Vec::new();
        collect_ranges(&mut self.reader, parent.start, parent.end, false, key, &mut out)?;
        tracing::debug!(key = %key, parent = ?parent, found = out.len(), "nested box query");
        Ok(out)
    }

    pub fn read_range(&mut self, range: ByteRange) -> Result<Vec<u8>> {
        read_slice(&mut self.reader, range, self.len)
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Open `path`, query it once and close it again.
pub fn box_ranges_in_file(path: impl AsRef<Path>, typ: FourCC) -> Result<Vec<ByteRange>> {
    BoxIndex::open(path)?.box_ranges(typ)
}
