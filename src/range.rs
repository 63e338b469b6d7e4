use serde::Serialize;

/// Half-open span `[start, end)` of absolute byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub const fn new(start: u64, end: u64) -> Self {
        ByteRange { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, other: &ByteRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Flatten ranges into `[start, end, start, end, ...]`.
pub fn flatten(ranges: &[ByteRange]) -> Vec<u64> {
    ranges.iter().flat_map(|r| [r.start, r.end]).collect()
}
