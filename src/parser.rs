use crate::boxes::{BoxHeader, BoxKey, FourCC};
use crate::error::{Error, Result};
use crate::known_boxes::KnownBox;
use crate::range::ByteRange;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Read, Seek, SeekFrom};

/// Deepest container nesting the walker will follow.
pub const MAX_DEPTH: usize = 64;

const MIN_HEADER: u64 = 8;

/// Read one box header at the current position.
///
/// `limit` is the end of the enclosing range; a box that would extend past it
/// is rejected. A declared size of 0 means "to the end of the enclosing
/// range" and is only honoured when `allow_to_end` is set.
pub fn read_box_header<R: Read + Seek>(r: &mut R, limit: u64, allow_to_end: bool) -> Result<BoxHeader> {
    let start = r.stream_position()?;
    if limit.saturating_sub(start) < MIN_HEADER {
        return Err(Error::TruncatedHeader(start));
    }
    let size32 = r.read_u32::<BigEndian>()?;
    let mut typ = [0u8; 4];
    r.read_exact(&mut typ)?;
    let typ = FourCC(typ);

    let mut header_size = MIN_HEADER;
    let mut size = size32 as u64;
    if size32 == 1 {
        if limit - start < header_size + 8 {
            return Err(Error::TruncatedHeader(start));
        }
        size = r.read_u64::<BigEndian>()?;
        header_size += 8;
    }

    let mut uuid = None;
    if &typ.0 == b"uuid" {
        if limit - start < header_size + 16 {
            return Err(Error::TruncatedHeader(start));
        }
        let mut u = [0u8; 16];
        r.read_exact(&mut u)?;
        uuid = Some(u);
        header_size += 16;
    }

    if size32 == 0 {
        if !allow_to_end {
            return Err(Error::InvalidSize { offset: start, size: 0 });
        }
        size = limit - start;
    }

    if size < header_size {
        return Err(Error::InvalidSize { offset: start, size });
    }
    if size > limit - start {
        return Err(Error::BoxOverrun { typ, offset: start, size, limit });
    }

    Ok(BoxHeader { size, typ, uuid, header_size, start })
}

/// Walk the boxes in `[start, end)` depth-first and collect the payload
/// range of every box matching `key`, in file order.
///
/// `top_level` marks the outermost sequence of a file, where a size of 0 is
/// legal.
pub fn collect_ranges<R: Read + Seek>(
    r: &mut R,
    start: u64,
    end: u64,
    top_level: bool,
    key: &BoxKey,
    out: &mut Vec<ByteRange>,
) -> Result<()> {
    walk(r, start, end, 0, top_level, key, out)
}

fn walk<R: Read + Seek>(
    r: &mut R,
    start: u64,
    end: u64,
    depth: usize,
    top_level: bool,
    key: &BoxKey,
    out: &mut Vec<ByteRange>,
) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(Error::TooDeep(MAX_DEPTH));
    }

    let mut pos = start;
    while pos < end {
        r.seek(SeekFrom::Start(pos))?;
        if end - pos < MIN_HEADER {
            // QuickTime allows a 32-bit zero terminator at the end of udta
            if trailing_padding(r, end - pos)? {
                tracing::trace!(offset = pos, "skipping zero padding");
                break;
            }
            return Err(Error::TruncatedHeader(pos));
        }

        let h = read_box_header(r, end, top_level && depth == 0)?;
        let payload = ByteRange::new(h.payload_start(), h.end());
        let kind = KnownBox::from(h.typ);
        tracing::trace!(typ = %h.typ, name = kind.full_name(), offset = h.start, size = h.size, depth, "box");

        if key.matches(&h) && !payload.is_empty() {
            out.push(payload);
        }

        if kind.is_container() {
            let skip = container_prefix(r, &h)?;
            walk(r, payload.start + skip, payload.end, depth + 1, top_level, key, out)?;
        }

        pos = h.end();
    }
    Ok(())
}

fn trailing_padding<R: Read>(r: &mut R, len: u64) -> Result<bool> {
    let mut tail = vec![0u8; len as usize];
    r.read_exact(&mut tail)?;
    Ok(tail.iter().all(|&b| b == 0))
}

/// Bytes between the header and the first child of a container.
///
/// ISO `meta` is a FullBox with 4 bytes of version/flags; the QuickTime
/// flavour goes straight to its `hdlr` child.
fn container_prefix<R: Read + Seek>(r: &mut R, h: &BoxHeader) -> Result<u64> {
    if KnownBox::from(h.typ) != KnownBox::Meta {
        return Ok(0);
    }
    let payload_len = h.size - h.header_size;
    if payload_len < 4 {
        return Ok(payload_len);
    }
    if payload_len >= 8 {
        r.seek(SeekFrom::Start(h.payload_start()))?;
        let mut peek = [0u8; 8];
        r.read_exact(&mut peek)?;
        if &peek[4..8] == b"hdlr" {
            return Ok(0);
        }
    }
    Ok(4)
}
