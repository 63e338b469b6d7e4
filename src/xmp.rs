//! XMP document model and redaction range calculator.
//!
//! Packets are tokenized with `quick_xml` on top of a [`TrackingReader`], so
//! every tag boundary can be mapped back to its offset in the original file.
//! Both serializations of a property are understood: as an attribute
//! (`xmpMM:DocumentID="..."`) and as a child element
//! (`<xmpMM:DocumentID>...</xmpMM:DocumentID>`).

use crate::error::{Error, Result};
use crate::index::BoxIndex;
use crate::locator::{ContainerKind, XmpSource, detect, locate};
use crate::range::{ByteRange, flatten};
use crate::tags::SensitiveTags;
use crate::tracking::TrackingReader;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::Serialize;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

/// Identity fields of an XMP packet. All `None` when there is no packet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct XmpDocument {
    pub format: Option<String>,
    pub document_id: Option<String>,
    pub instance_id: Option<String>,
    pub original_document_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Format,
    DocumentId,
    InstanceId,
    OriginalDocumentId,
}

impl Field {
    fn from_local(local: &[u8]) -> Option<Self> {
        match local {
            b"format" => Some(Field::Format),
            b"DocumentID" => Some(Field::DocumentId),
            b"InstanceID" => Some(Field::InstanceId),
            b"OriginalDocumentID" => Some(Field::OriginalDocumentId),
            _ => None,
        }
    }
}

impl XmpDocument {
    /// Parse a bare packet. Malformed XML is an error.
    pub fn parse<R: Read>(source: R) -> Result<Self> {
        Ok(scan_packet(source, 0, &SensitiveTags::empty())?.document)
    }

    pub fn from_source<R: Read + Seek>(source: XmpSource<'_, R>) -> Result<Self> {
        Ok(scan(source, &SensitiveTags::empty())?.document)
    }

    pub fn is_empty(&self) -> bool {
        self == &XmpDocument::default()
    }

    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Format => &mut self.format,
            Field::DocumentId => &mut self.document_id,
            Field::InstanceId => &mut self.instance_id,
            Field::OriginalDocumentId => &mut self.original_document_id,
        }
    }

    fn fill(&mut self, field: Field, value: &str) {
        let slot = self.slot(field);
        let value = value.trim();
        if slot.is_none() && !value.is_empty() {
            *slot = Some(value.to_string());
        }
    }
}

/// Result of one pass over a packet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct XmpScan {
    pub document: XmpDocument,
    /// Spans covering every sensitive tag, absolute and in document order.
    pub ranges: Vec<ByteRange>,
}

impl XmpScan {
    pub fn offsets(&self) -> Vec<u64> {
        flatten(&self.ranges)
    }
}

/// Locate the packet of `source` and scan it.
///
/// Raw XML is streamed straight through the tokenizer. No packet gives an
/// empty scan; a malformed packet gives an error and no ranges.
pub fn scan<R: Read + Seek>(source: XmpSource<'_, R>, tags: &SensitiveTags) -> Result<XmpScan> {
    match source {
        XmpSource::RawXml(r) => scan_packet(r, 0, tags),
        other => match locate(other)? {
            Some(packet) => scan_packet(packet.bytes.as_slice(), packet.offset, tags),
            None => Ok(XmpScan::default()),
        },
    }
}

/// Open `path`, pick the packet location from its magic bytes and scan it.
///
/// Files with no recognised signature are refused rather than scanned as XML.
pub fn scan_file(path: impl AsRef<Path>, tags: &SensitiveTags) -> Result<XmpScan> {
    let mut file = File::open(path)?;
    match detect(&mut file)? {
        ContainerKind::Jpeg | ContainerKind::Tiff => scan(XmpSource::exif(file)?, tags),
        ContainerKind::IsoBmff => {
            let mut index = BoxIndex::new(file)?;
            scan(XmpSource::iso(&mut index)?, tags)
        }
        ContainerKind::Xml => scan(XmpSource::RawXml(file), tags),
        ContainerKind::Unknown => Err(Error::UnsupportedContainer),
    }
}

/// Scan a packet whose first byte sits at `base` in the original file.
pub fn scan_packet<R: Read>(source: R, base: u64, tags: &SensitiveTags) -> Result<XmpScan> {
    let mut reader = Reader::from_reader(TrackingReader::with_base(source, base));
    let mut state = ScanState::new(tags);
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf)?;
        let end = reader.get_ref().offset();
        match event {
            Event::Start(e) => {
                let start = end - e.len() as u64 - 2;
                state.open(&e, start)?;
            }
            Event::Empty(e) => {
                let start = end - e.len() as u64 - 3;
                state.empty(&e, start, end)?;
            }
            Event::End(_) => state.close(end),
            Event::Text(t) => state.text(&t.unescape()?),
            Event::CData(c) => state.text(&String::from_utf8_lossy(&c)),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = state.stack.last() {
        return Err(Error::UnclosedElement(String::from_utf8_lossy(open).into_owned()));
    }
    tracing::debug!(base, ranges = state.scan.ranges.len(), "scanned XMP packet");
    Ok(state.scan)
}

struct Capture {
    field: Field,
    depth: usize,
    text: String,
    nested: bool,
}

struct ScanState<'t> {
    tags: &'t SensitiveTags,
    scan: XmpScan,
    stack: Vec<Vec<u8>>,
    redaction: Option<(usize, u64)>, // depth and start of the element being redacted
    capture: Option<Capture>,
}

impl<'t> ScanState<'t> {
    fn new(tags: &'t SensitiveTags) -> Self {
        ScanState {
            tags,
            scan: XmpScan::default(),
            stack: Vec::new(),
            redaction: None,
            capture: None,
        }
    }

    fn open(&mut self, e: &BytesStart<'_>, start: u64) -> Result<()> {
        let local = e.local_name();
        let matched = self.redaction.is_none() && self.tags.contains(local.as_ref());
        self.attributes(e, start, self.redaction.is_some() || matched)?;
        if let Some(capture) = &mut self.capture {
            capture.nested = true;
        }

        self.stack.push(e.name().as_ref().to_vec());
        let depth = self.stack.len();
        if matched {
            self.redaction = Some((depth, start));
        }
        if self.capture.is_none() {
            if let Some(field) = Field::from_local(local.as_ref()) {
                if self.scan.document.slot(field).is_none() {
                    self.capture = Some(Capture { field, depth, text: String::new(), nested: false });
                }
            }
        }
        Ok(())
    }

    fn empty(&mut self, e: &BytesStart<'_>, start: u64, end: u64) -> Result<()> {
        let matched = self.redaction.is_none() && self.tags.contains(e.local_name().as_ref());
        self.attributes(e, start, self.redaction.is_some() || matched)?;
        if let Some(capture) = &mut self.capture {
            capture.nested = true;
        }
        if matched {
            self.scan.ranges.push(ByteRange::new(start, end));
        }
        Ok(())
    }

    fn close(&mut self, end: u64) {
        let depth = self.stack.len();
        self.stack.pop();

        if self.capture.as_ref().is_some_and(|c| c.depth == depth) {
            if let Some(c) = self.capture.take() {
                if !c.nested {
                    self.scan.document.fill(c.field, &c.text);
                }
            }
        }
        if let Some((at, start)) = self.redaction {
            if at == depth {
                self.scan.ranges.push(ByteRange::new(start, end));
                self.redaction = None;
            }
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(c) = &mut self.capture {
            if c.depth == self.stack.len() {
                c.text.push_str(text);
            }
        }
    }

    /// Pull field values out of the attributes of `e` and record the span of
    /// every sensitive attribute, unless an enclosing range already covers it.
    fn attributes(&mut self, e: &BytesStart<'_>, tag_start: u64, covered: bool) -> Result<()> {
        let malformed = || Error::MalformedAttributes(String::from_utf8_lossy(e.name().as_ref()).into_owned());
        let spans = attribute_spans(e, e.name().as_ref().len()).ok_or_else(malformed)?;
        let mut spans = spans.into_iter();

        for attr in e.attributes() {
            let attr = attr?;
            let (from, to) = spans.next().ok_or_else(malformed)?;
            let local = attr.key.local_name();
            if let Some(field) = Field::from_local(local.as_ref()) {
                self.scan.document.fill(field, &attr.unescape_value()?);
            }
            if !covered && self.tags.contains(local.as_ref()) {
                // +1 for the '<' that precedes the tag content
                let range = ByteRange::new(tag_start + 1 + from as u64, tag_start + 1 + to as u64);
                self.scan.ranges.push(range);
            }
        }
        if spans.next().is_some() {
            return Err(malformed());
        }
        Ok(())
    }
}

/// Spans `key..closing quote` of each attribute in the raw content of a tag
/// (the bytes between `<` and `>`), relative to that content.
fn attribute_spans(content: &[u8], name_len: usize) -> Option<Vec<(usize, usize)>> {
    let n = content.len();
    let skip_ws = |mut i: usize| {
        while i < n && content[i].is_ascii_whitespace() {
            i += 1;
        }
        i
    };

    let mut spans = Vec::new();
    let mut i = name_len;
    loop {
        i = skip_ws(i);
        if i >= n {
            return Some(spans);
        }
        let key_start = i;
        while i < n && content[i] != b'=' && !content[i].is_ascii_whitespace() {
            i += 1;
        }
        i = skip_ws(i);
        if i >= n || content[i] != b'=' {
            return None;
        }
        i = skip_ws(i + 1);
        let quote = *content.get(i)?;
        if quote != b'"' && quote != b'\'' {
            return None;
        }
        let close = i + 1 + content[i + 1..].iter().position(|&b| b == quote)?;
        i = close + 1;
        spans.push((key_start, i));
    }
}
