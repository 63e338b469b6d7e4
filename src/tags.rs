use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::Read;

/// Local names of the `exif:` GPS properties that can appear in XMP.
pub const GPS_TAGS: &[&str] = &[
    "GPSVersionID",
    "GPSLatitude",
    "GPSLongitude",
    "GPSAltitudeRef",
    "GPSAltitude",
    "GPSTimeStamp",
    "GPSSatellites",
    "GPSStatus",
    "GPSMeasureMode",
    "GPSDOP",
    "GPSSpeedRef",
    "GPSSpeed",
    "GPSTrackRef",
    "GPSTrack",
    "GPSImgDirectionRef",
    "GPSImgDirection",
    "GPSMapDatum",
    "GPSDestLatitude",
    "GPSDestLongitude",
    "GPSDestBearingRef",
    "GPSDestBearing",
    "GPSDestDistanceRef",
    "GPSDestDistance",
    "GPSProcessingMethod",
    "GPSAreaInformation",
    "GPSDifferential",
];

/// Set of tag local names whose occurrences must be redacted.
///
/// Names are compared on their local part only, so `exif:GPSLatitude` and
/// `GPSLatitude` select the same tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct SensitiveTags {
    names: BTreeSet<String>,
}

impl SensitiveTags {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|n| local_part(n.as_ref()).to_string())
            .filter(|n| !n.is_empty())
            .collect();
        SensitiveTags { names }
    }

    pub fn gps() -> Self {
        SensitiveTags::new(GPS_TAGS)
    }

    pub fn empty() -> Self {
        SensitiveTags { names: BTreeSet::new() }
    }

    /// Load a JSON array of tag names.
    pub fn from_json<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn contains(&self, local_name: &[u8]) -> bool {
        std::str::from_utf8(local_name).is_ok_and(|n| self.names.contains(n))
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl Default for SensitiveTags {
    fn default() -> Self {
        SensitiveTags::gps()
    }
}

impl From<Vec<String>> for SensitiveTags {
    fn from(names: Vec<String>) -> Self {
        SensitiveTags::new(names)
    }
}

impl From<SensitiveTags> for Vec<String> {
    fn from(tags: SensitiveTags) -> Self {
        tags.names.into_iter().collect()
    }
}

fn local_part(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name).trim()
}
