pub mod boxes;
pub mod error;
pub mod exif;
pub mod index;
pub mod known_boxes;
pub mod locator;
pub mod parser;
pub mod range;
pub mod tags;
pub mod tracking;
pub mod util;
pub mod xmp;

pub use boxes::{BoxHeader, BoxKey, FourCC};
pub use error::{Error, Result};
pub use exif::{AttributeRanges, ExifReader, TAG_XMP};
pub use index::{BoxIndex, box_ranges_in_file};
pub use locator::{ContainerKind, XmpPacket, XmpSource, detect, locate};
pub use parser::read_box_header;
pub use range::ByteRange;
pub use tags::SensitiveTags;
pub use tracking::{OffsetCounter, TrackingReader, token_offsets};
pub use xmp::{XmpDocument, XmpScan, scan, scan_file, scan_packet};
