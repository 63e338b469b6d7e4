use crate::error::{Error, Result};
use crate::range::ByteRange;
use std::io::{Read, Seek, SeekFrom};

/// Read `range` from `r`, refusing ranges that end past `len`.
pub fn read_slice<R: Read + Seek>(r: &mut R, range: ByteRange, len: u64) -> Result<Vec<u8>> {
    if range.end > len || range.start > range.end {
        return Err(Error::RangeOutOfBounds { start: range.start, end: range.end, len });
    }
    r.seek(SeekFrom::Start(range.start))?;
    let mut v = vec![0u8; range.len() as usize];
    r.read_exact(&mut v)?;
    Ok(v)
}

/// Total length of a seekable source; leaves the cursor at the start.
pub fn stream_len<R: Seek>(r: &mut R) -> Result<u64> {
    let len = r.seek(SeekFrom::End(0))?;
    r.seek(SeekFrom::Start(0))?;
    Ok(len)
}
