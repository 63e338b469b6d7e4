use crate::boxes::FourCC;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid box size {size} at offset {offset}")]
    InvalidSize { offset: u64, size: u64 },

    #[error("box '{typ}' at offset {offset} (size {size}) runs past its parent ending at {limit}")]
    BoxOverrun {
        typ: FourCC,
        offset: u64,
        size: u64,
        limit: u64,
    },

    #[error("truncated box header at offset {0}")]
    TruncatedHeader(u64),

    #[error("box nesting deeper than {0} levels")]
    TooDeep(usize),

    #[error("range {start}..{end} lies outside the {len}-byte source")]
    RangeOutOfBounds { start: u64, end: u64, len: u64 },

    #[error("unsupported container: no JPEG, TIFF, ISO-BMFF or XML signature")]
    UnsupportedContainer,

    #[error("exif: {0}")]
    InvalidExif(String),

    #[error("xml: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("xml attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("xml: malformed attribute list in <{0}>")]
    MalformedAttributes(String),

    #[error("xml: element <{0}> is never closed")]
    UnclosedElement(String),

    #[error("tag config: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
