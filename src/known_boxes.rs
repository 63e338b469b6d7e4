use crate::boxes::FourCC;

/// Typed view over the ISOBMFF / QuickTime boxes the walker cares about.
///
/// Anything not in this list becomes `KnownBox::Unknown(fourcc)` and is
/// treated as an opaque leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownBox {
    // File-level / top-level
    Ftyp,
    Moov,
    Mdat,
    Free,
    Skip,
    Wide,
    Meta,
    Uuid,
    Moof,
    Mfra,

    // moov / trak / mdia / minf
    Mvhd,
    Trak,
    Mvex,
    Udta,
    Tkhd,
    Edts,
    Mdia,
    Mdhd,
    Hdlr,
    Minf,
    Dinf,
    Stbl,
    Traf,

    // Protection / HEIF item properties
    Sinf,
    Schi,
    Iprp,
    Ipco,

    // Metadata carriers
    Ilst,
    Xmp,
    LocationIso6709, // ©xyz
    Gps0,

    Unknown(FourCC),
}

pub const UDTA: FourCC = FourCC(*b"udta");
pub const XMP_BOX: FourCC = FourCC(*b"XMP_");
pub const LOCATION_BOX: FourCC = FourCC([0xA9, b'x', b'y', b'z']);

/// Extended type of the top-level `uuid` box that carries XMP.
pub const XMP_UUID: [u8; 16] = [
    0xBE, 0x7A, 0xCF, 0xCB, 0x97, 0xA9, 0x42, 0xE8, 0x9C, 0x71, 0x99, 0x94, 0x91, 0xE3, 0xAF, 0xAC,
];

impl From<FourCC> for KnownBox {
    fn from(cc: FourCC) -> Self {
        match &cc.0 {
            b"ftyp" => KnownBox::Ftyp,
            b"moov" => KnownBox::Moov,
            b"mdat" => KnownBox::Mdat,
            b"free" => KnownBox::Free,
            b"skip" => KnownBox::Skip,
            b"wide" => KnownBox::Wide,
            b"meta" => KnownBox::Meta,
            b"uuid" => KnownBox::Uuid,
            b"moof" => KnownBox::Moof,
            b"mfra" => KnownBox::Mfra,
            b"mvhd" => KnownBox::Mvhd,
            b"trak" => KnownBox::Trak,
            b"mvex" => KnownBox::Mvex,
            b"udta" => KnownBox::Udta,
            b"tkhd" => KnownBox::Tkhd,
            b"edts" => KnownBox::Edts,
            b"mdia" => KnownBox::Mdia,
            b"mdhd" => KnownBox::Mdhd,
            b"hdlr" => KnownBox::Hdlr,
            b"minf" => KnownBox::Minf,
            b"dinf" => KnownBox::Dinf,
            b"stbl" => KnownBox::Stbl,
            b"traf" => KnownBox::Traf,
            b"sinf" => KnownBox::Sinf,
            b"schi" => KnownBox::Schi,
            b"iprp" => KnownBox::Iprp,
            b"ipco" => KnownBox::Ipco,
            b"ilst" => KnownBox::Ilst,
            b"XMP_" => KnownBox::Xmp,
            [0xA9, b'x', b'y', b'z'] => KnownBox::LocationIso6709,
            b"gps0" => KnownBox::Gps0,
            _ => KnownBox::Unknown(cc),
        }
    }
}

impl KnownBox {
    pub fn full_name(&self) -> &'static str {
        match self {
            KnownBox::Ftyp => "File Type Box",
            KnownBox::Moov => "Movie Box",
            KnownBox::Mdat => "Media Data Box",
            KnownBox::Free => "Free Space Box",
            KnownBox::Skip => "Skip Box",
            KnownBox::Wide => "Wide Box",
            KnownBox::Meta => "Meta Box",
            KnownBox::Uuid => "User Extension Box",
            KnownBox::Moof => "Movie Fragment Box",
            KnownBox::Mfra => "Movie Fragment Random Access Box",
            KnownBox::Mvhd => "Movie Header Box",
            KnownBox::Trak => "Track Box",
            KnownBox::Mvex => "Movie Extends Box",
            KnownBox::Udta => "User Data Box",
            KnownBox::Tkhd => "Track Header Box",
            KnownBox::Edts => "Edit Box",
            KnownBox::Mdia => "Media Box",
            KnownBox::Mdhd => "Media Header Box",
            KnownBox::Hdlr => "Handler Reference Box",
            KnownBox::Minf => "Media Information Box",
            KnownBox::Dinf => "Data Information Box",
            KnownBox::Stbl => "Sample Table Box",
            KnownBox::Traf => "Track Fragment Box",
            KnownBox::Sinf => "Protection Scheme Information Box",
            KnownBox::Schi => "Scheme Information Box",
            KnownBox::Iprp => "Item Properties Box",
            KnownBox::Ipco => "Item Property Container Box",
            KnownBox::Ilst => "Metadata Item List Box",
            KnownBox::Xmp => "XMP Metadata Box",
            KnownBox::LocationIso6709 => "ISO 6709 Location Box",
            KnownBox::Gps0 => "GPS Data Box",
            KnownBox::Unknown(_) => "Unknown Box",
        }
    }

    /// Does the payload of this box consist of child boxes?
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            KnownBox::Moov
                | KnownBox::Trak
                | KnownBox::Mdia
                | KnownBox::Minf
                | KnownBox::Stbl
                | KnownBox::Edts
                | KnownBox::Dinf
                | KnownBox::Udta
                | KnownBox::Meta
                | KnownBox::Ilst
                | KnownBox::Moof
                | KnownBox::Traf
                | KnownBox::Mvex
                | KnownBox::Mfra
                | KnownBox::Sinf
                | KnownBox::Schi
                | KnownBox::Iprp
                | KnownBox::Ipco
        )
    }
}
