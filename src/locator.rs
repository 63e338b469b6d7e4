use crate::boxes::BoxKey;
use crate::error::Result;
use crate::exif::{AttributeRanges, ExifReader, TAG_XMP};
use crate::index::BoxIndex;
use crate::known_boxes::{UDTA, XMP_BOX, XMP_UUID};
use crate::range::ByteRange;
use crate::util::{read_slice, stream_len};
use std::io::{Read, Seek, SeekFrom};

/// Where an XMP packet is to be looked for.
pub enum XmpSource<'a, R> {
    /// The whole stream is the packet.
    RawXml(R),
    /// The packet is the value of the XMP attribute of a JPEG/TIFF file.
    ExifEmbedded {
        container: R,
        attribute: Option<ByteRange>,
    },
    /// The packet sits in an `XMP_` box under `udta`, or in the XMP `uuid`
    /// box at the top of the file.
    IsoEmbedded {
        index: &'a mut BoxIndex<R>,
        udta: Option<ByteRange>,
    },
}

impl<'a, R: Read + Seek> XmpSource<'a, R> {
    /// Ask the EXIF directory of `container` where its XMP attribute lives.
    pub fn exif(mut container: R) -> Result<Self> {
        let attribute = ExifReader::new(&mut container)?.attribute_range(TAG_XMP)?;
        Ok(XmpSource::ExifEmbedded { container, attribute })
    }

    /// Use the first `udta` box of `index` that holds an `XMP_` child.
    ///
    /// Track-level `udta` boxes usually come before the movie-level one in
    /// file order, so every candidate is checked.
    pub fn iso(index: &'a mut BoxIndex<R>) -> Result<Self> {
        let mut udta = None;
        for candidate in index.box_ranges(UDTA)? {
            if !index.ranges_within(candidate, &BoxKey::FourCC(XMP_BOX))?.is_empty() {
                udta = Some(candidate);
                break;
            }
        }
        Ok(XmpSource::IsoEmbedded { index, udta })
    }
}

/// An XMP packet cut out of its container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmpPacket {
    pub bytes: Vec<u8>,
    /// Absolute offset of `bytes[0]` in the original file.
    pub offset: u64,
}

/// Find the XMP packet of `source`.
///
/// A source without a packet is not an error and yields `Ok(None)`.
pub fn locate<R: Read + Seek>(source: XmpSource<'_, R>) -> Result<Option<XmpPacket>> {
    let packet = match source {
        XmpSource::RawXml(mut r) => {
            let mut bytes = Vec::new();
            r.read_to_end(&mut bytes)?;
            (!bytes.is_empty()).then_some(XmpPacket { bytes, offset: 0 })
        }
        XmpSource::ExifEmbedded { mut container, attribute } => match attribute {
            Some(range) if !range.is_empty() => {
                let len = stream_len(&mut container)?;
                let bytes = read_slice(&mut container, range, len)?;
                Some(XmpPacket { bytes, offset: range.start })
            }
            _ => None,
        },
        XmpSource::IsoEmbedded { index, udta } => match iso_packet_range(index, udta)? {
            Some(range) => Some(XmpPacket { bytes: index.read_range(range)?, offset: range.start }),
            None => None,
        },
    };
    match &packet {
        Some(p) => tracing::debug!(offset = p.offset, len = p.bytes.len(), "located XMP packet"),
        None => tracing::debug!("no XMP packet"),
    }
    Ok(packet)
}

pub(crate) fn iso_packet_range<R: Read + Seek>(
    index: &mut BoxIndex<R>,
    udta: Option<ByteRange>,
) -> Result<Option<ByteRange>> {
    if let Some(udta) = udta {
        let found = index.ranges_within(udta, &BoxKey::FourCC(XMP_BOX))?;
        if let Some(range) = found.into_iter().next() {
            return Ok(Some(range));
        }
    }
    Ok(index.uuid_ranges(XMP_UUID)?.into_iter().next())
}

/// Container family, judged from the first bytes of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Jpeg,
    Tiff,
    IsoBmff,
    Xml,
    Unknown,
}

pub fn detect<R: Read + Seek>(r: &mut R) -> Result<ContainerKind> {
    r.seek(SeekFrom::Start(0))?;
    let mut head = [0u8; 12];
    let mut n = 0;
    while n < head.len() {
        match r.read(&mut head[n..])? {
            0 => break,
            k => n += k,
        }
    }
    r.seek(SeekFrom::Start(0))?;
    let head = &head[..n];

    let kind = if head.starts_with(&[0xFF, 0xD8, 0xFF]) {
        ContainerKind::Jpeg
    } else if head.starts_with(b"II*\0") || head.starts_with(b"MM\0*") {
        ContainerKind::Tiff
    } else if n >= 8 && &head[4..8] == b"ftyp" {
        ContainerKind::IsoBmff
    } else if looks_like_xml(head) {
        ContainerKind::Xml
    } else {
        ContainerKind::Unknown
    };
    Ok(kind)
}

/// Empty input, or markup after an optional UTF-8 BOM and leading whitespace.
fn looks_like_xml(head: &[u8]) -> bool {
    let head = head.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(head);
    match head.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(&b) => b == b'<',
        None => true,
    }
}
