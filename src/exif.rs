//! Byte ranges of EXIF/TIFF attributes inside JPEG and TIFF-family files.

use crate::error::{Error, Result};
use crate::range::ByteRange;
use crate::util::stream_len;
use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};
use std::io::{Read, Seek, SeekFrom};

/// `ApplicationNotes`, the IFD0 tag that carries an XMP packet.
pub const TAG_XMP: u16 = 0x02BC;
pub const TAG_EXIF_IFD: u16 = 0x8769;
pub const TAG_GPS_IFD: u16 = 0x8825;

const EXIF_SIGNATURE: &[u8] = b"Exif\0\0";
const XMP_SIGNATURE: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";

const MARKER_SOS: u8 = 0xDA;
const MARKER_EOI: u8 = 0xD9;
const MARKER_APP1: u8 = 0xE1;

/// Anything that can say where the value of an EXIF attribute lives.
pub trait AttributeRanges {
    /// Absolute byte range of the raw value of `tag`, or `None` if the file
    /// does not carry it.
    fn attribute_range(&mut self, tag: u16) -> Result<Option<ByteRange>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endian {
    Little,
    Big,
}

impl Endian {
    fn u16(self, b: &[u8]) -> u16 {
        match self {
            Endian::Little => LittleEndian::read_u16(b),
            Endian::Big => BigEndian::read_u16(b),
        }
    }

    fn u32(self, b: &[u8]) -> u32 {
        match self {
            Endian::Little => LittleEndian::read_u32(b),
            Endian::Big => BigEndian::read_u32(b),
        }
    }
}

/// A TIFF structure somewhere inside the file.
#[derive(Debug, Clone, Copy)]
struct Tiff {
    start: u64,
    end: u64,
    order: Endian,
}

#[derive(Debug, Clone, Copy)]
struct IfdEntry {
    tag: u16,
    typ: u16,
    count: u32,
    value_field: u64, // absolute offset of the 4-byte value/offset field
    value_offset: u32,
}

fn type_size(typ: u16) -> Option<u64> {
    match typ {
        1 | 2 | 6 | 7 => Some(1), // BYTE, ASCII, SBYTE, UNDEFINED
        3 | 8 => Some(2),         // SHORT, SSHORT
        4 | 9 | 11 => Some(4),    // LONG, SLONG, FLOAT
        5 | 10 | 12 => Some(8),   // RATIONAL, SRATIONAL, DOUBLE
        _ => None,
    }
}

/// EXIF attribute locator for JPEG (APP1) and bare TIFF/DNG files.
///
/// JPEG APP1 segments carrying an XMP packet are reported under
/// [`TAG_XMP`], the same way the packet is addressed in TIFF files.
#[derive(Debug)]
pub struct ExifReader<R> {
    reader: R,
    len: u64,
}

impl<R: Read + Seek> ExifReader<R> {
    pub fn new(mut reader: R) -> Result<Self> {
        let len = stream_len(&mut reader)?;
        Ok(ExifReader { reader, len })
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    fn find_in_jpeg(&mut self, tag: u16) -> Result<Option<ByteRange>> {
        let mut pos = 2;
        while pos + 4 <= self.len {
            self.reader.seek(SeekFrom::Start(pos))?;
            if self.reader.read_u8()? != 0xFF {
                return Err(Error::InvalidExif(format!("expected JPEG marker at offset {pos}")));
            }
            let mut marker = self.reader.read_u8()?;
            pos += 2;
            while marker == 0xFF {
                marker = self.reader.read_u8()?;
                pos += 1;
            }
            match marker {
                MARKER_SOS | MARKER_EOI => break,
                0x01 | 0xD0..=0xD8 => continue,
                _ => {}
            }

            let seg_len = self.reader.read_u16::<BigEndian>()? as u64;
            if seg_len < 2 || pos + seg_len > self.len {
                return Err(Error::InvalidExif(format!(
                    "JPEG segment 0x{marker:02X} at offset {pos} has bad length {seg_len}"
                )));
            }
            let payload = ByteRange::new(pos + 2, pos + seg_len);
            pos = payload.end;

            if marker != MARKER_APP1 {
                continue;
            }
            if self.starts_with(payload, EXIF_SIGNATURE)? {
                let sig = EXIF_SIGNATURE.len() as u64;
                let tiff = self.tiff_at(ByteRange::new(payload.start + sig, payload.end))?;
                if let Some(range) = self.find_in_tiff(tiff, tag)? {
                    return Ok(Some(range));
                }
            } else if tag == TAG_XMP && self.starts_with(payload, XMP_SIGNATURE)? {
                let sig = XMP_SIGNATURE.len() as u64;
                return Ok(Some(ByteRange::new(payload.start + sig, payload.end)));
            }
        }
        Ok(None)
    }

    fn starts_with(&mut self, range: ByteRange, sig: &[u8]) -> Result<bool> {
        if range.len() < sig.len() as u64 {
            return Ok(false);
        }
        self.reader.seek(SeekFrom::Start(range.start))?;
        let mut head = vec![0u8; sig.len()];
        self.reader.read_exact(&mut head)?;
        Ok(head == sig)
    }

    fn tiff_at(&mut self, range: ByteRange) -> Result<Tiff> {
        if range.len() < 8 {
            return Err(Error::InvalidExif(format!("TIFF header at {} is truncated", range.start)));
        }
        self.reader.seek(SeekFrom::Start(range.start))?;
        let mut hdr = [0u8; 4];
        self.reader.read_exact(&mut hdr)?;
        let order = match &hdr[..2] {
            b"II" => Endian::Little,
            b"MM" => Endian::Big,
            _ => {
                return Err(Error::InvalidExif(format!(
                    "unknown TIFF byte order at offset {}",
                    range.start
                )));
            }
        };
        if order.u16(&hdr[2..4]) != 42 {
            return Err(Error::InvalidExif(format!("bad TIFF magic at offset {}", range.start)));
        }
        Ok(Tiff { start: range.start, end: range.end, order })
    }

    fn find_in_tiff(&mut self, tiff: Tiff, tag: u16) -> Result<Option<ByteRange>> {
        self.reader.seek(SeekFrom::Start(tiff.start + 4))?;
        let mut raw = [0u8; 4];
        self.reader.read_exact(&mut raw)?;
        let ifd0 = tiff.order.u32(&raw);

        let entries = self.read_ifd(tiff, ifd0)?;
        if let Some(e) = entries.iter().find(|e| e.tag == tag) {
            return self.entry_range(tiff, e).map(Some);
        }

        for pointer in [TAG_EXIF_IFD, TAG_GPS_IFD] {
            let Some(sub) = entries.iter().find(|e| e.tag == pointer) else {
                continue;
            };
            let sub_entries = self.read_ifd(tiff, sub.value_offset)?;
            if let Some(e) = sub_entries.iter().find(|e| e.tag == tag) {
                return self.entry_range(tiff, e).map(Some);
            }
        }
        Ok(None)
    }

    fn read_ifd(&mut self, tiff: Tiff, offset: u32) -> Result<Vec<IfdEntry>> {
        let at = tiff.start + offset as u64;
        if at + 2 > tiff.end {
            return Err(Error::InvalidExif(format!("IFD offset {offset} is out of bounds")));
        }
        self.reader.seek(SeekFrom::Start(at))?;
        let mut raw = [0u8; 2];
        self.reader.read_exact(&mut raw)?;
        let count = tiff.order.u16(&raw) as u64;
        let table = at + 2;
        if table + count * 12 > tiff.end {
            return Err(Error::InvalidExif(format!("IFD at offset {at} runs past its segment")));
        }

        let mut buf = vec![0u8; (count * 12) as usize];
        self.reader.read_exact(&mut buf)?;
        let entries = buf
            .chunks_exact(12)
            .enumerate()
            .map(|(i, e)| IfdEntry {
                tag: tiff.order.u16(&e[0..2]),
                typ: tiff.order.u16(&e[2..4]),
                count: tiff.order.u32(&e[4..8]),
                value_field: table + i as u64 * 12 + 8,
                value_offset: tiff.order.u32(&e[8..12]),
            })
            .collect();
        Ok(entries)
    }

    fn entry_range(&self, tiff: Tiff, e: &IfdEntry) -> Result<ByteRange> {
        let size = type_size(e.typ).ok_or_else(|| {
            Error::InvalidExif(format!("tag 0x{:04X} has unknown type {}", e.tag, e.typ))
        })?;
        let byte_len = e.count as u64 * size;
        if byte_len <= 4 {
            return Ok(ByteRange::new(e.value_field, e.value_field + byte_len));
        }
        let start = tiff.start + e.value_offset as u64;
        let end = start + byte_len;
        if end > tiff.end {
            return Err(Error::InvalidExif(format!(
                "value of tag 0x{:04X} ({byte_len} bytes at {start}) runs past its segment",
                e.tag
            )));
        }
        Ok(ByteRange::new(start, end))
    }
}

impl<R: Read + Seek> AttributeRanges for ExifReader<R> {
    fn attribute_range(&mut self, tag: u16) -> Result<Option<ByteRange>> {
        if self.len < 4 {
            return Ok(None);
        }
        self.reader.seek(SeekFrom::Start(0))?;
        let mut magic = [0u8; 4];
        self.reader.read_exact(&mut magic)?;

        let found = match magic {
            [0xFF, 0xD8, ..] => self.find_in_jpeg(tag)?,
            [b'I', b'I', 0x2A, 0x00] | [b'M', b'M', 0x00, 0x2A] => {
                let tiff = self.tiff_at(ByteRange::new(0, self.len))?;
                self.find_in_tiff(tiff, tag)?
            }
            _ => None,
        };
        tracing::debug!(tag, range = ?found, "exif attribute lookup");
        Ok(found)
    }
}
