use std::fmt;

#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// Build a type code from four characters in the Latin-1 range, so that
    /// codes such as `©xyz` (first byte `0xA9`) can be written as text.
    pub fn from_latin1(s: &str) -> Option<Self> {
        let mut out = [0u8; 4];
        let mut n = 0;
        for c in s.chars() {
            if n == 4 || (c as u32) > 0xFF {
                return None;
            }
            out[n] = c as u32 as u8;
            n += 1;
        }
        (n == 4).then_some(FourCC(out))
    }

    pub const fn from_u32(code: u32) -> Self {
        FourCC(code.to_be_bytes())
    }

    pub const fn as_u32(&self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    pub fn as_str_lossy(&self) -> String {
        self.0
            .iter()
            .map(|&c| match c {
                32..=126 => c as char,
                0xA9 => '©',
                _ => '.',
            })
            .collect()
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

#[derive(Debug, Clone)]
pub struct BoxHeader {
    pub size: u64,        // total size including header, resolved for size==0
    pub typ: FourCC,      // 4CC or b"uuid"
    pub uuid: Option<[u8; 16]>,
    pub header_size: u64, // 8, 16, 24 or 32
    pub start: u64,       // file offset of header start
}

impl BoxHeader {
    pub fn payload_start(&self) -> u64 {
        self.start + self.header_size
    }

    pub fn end(&self) -> u64 {
        self.start + self.size
    }
}

/// What a box query matches on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BoxKey {
    FourCC(FourCC),
    Uuid([u8; 16]),
}

impl BoxKey {
    pub fn matches(&self, hdr: &BoxHeader) -> bool {
        match self {
            BoxKey::FourCC(t) => hdr.typ == *t,
            BoxKey::Uuid(u) => hdr.uuid.as_ref() == Some(u),
        }
    }
}

impl fmt::Display for BoxKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoxKey::FourCC(t) => write!(f, "{t}"),
            BoxKey::Uuid(u) => write!(f, "uuid:{}", hex::encode(u)),
        }
    }
}
