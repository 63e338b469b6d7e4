use mediaredact::known_boxes::XMP_UUID;
use mediaredact::{
    BoxIndex, ByteRange, ContainerKind, Error, SensitiveTags, XmpScan, XmpSource, detect, scan,
    scan_file, scan_packet,
};
use std::io::{Cursor, Write};

const ATTRIBUTE_FORM: &[u8] = include_bytes!("fixtures/xmp_attribute.xml");
const ELEMENT_FORM: &[u8] = include_bytes!("fixtures/xmp_element.xml");
const ODD: &[u8] = include_bytes!("fixtures/gps_odd.xml");
const MALFORMED: &[u8] = include_bytes!("fixtures/gps_malformed.xml");
const JPEG: &[u8] = include_bytes!("fixtures/gps_exif.jpg");
const TIFF: &[u8] = include_bytes!("fixtures/xmp_bigendian.tif");
const VIDEO: &[u8] = include_bytes!("fixtures/gps_video.mp4");
const UUID_VIDEO: &[u8] = include_bytes!("fixtures/xmp_uuid.mp4");

const RAW_ATTRIBUTE_GPS: [u64; 8] = [695, 722, 727, 757, 762, 792, 797, 837];
const RAW_ELEMENT_GPS: [u64; 8] = [922, 967, 971, 1019, 1023, 1072, 1076, 1135];

fn raw(bytes: &[u8], tags: &SensitiveTags) -> mediaredact::Result<XmpScan> {
    scan(XmpSource::RawXml(Cursor::new(bytes.to_vec())), tags)
}

fn exif(bytes: &[u8]) -> XmpScan {
    let source = XmpSource::exif(Cursor::new(bytes.to_vec())).unwrap();
    scan(source, &SensitiveTags::gps()).unwrap()
}

fn iso(bytes: &[u8]) -> XmpScan {
    let mut index = BoxIndex::new(Cursor::new(bytes.to_vec())).unwrap();
    scan(XmpSource::iso(&mut index).unwrap(), &SensitiveTags::gps()).unwrap()
}

fn bx(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&(8 + payload.len() as u32).to_be_bytes());
    v.extend_from_slice(typ);
    v.extend_from_slice(payload);
    v
}

fn xmp_uuid_box(packet: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&(24 + packet.len() as u32).to_be_bytes());
    v.extend_from_slice(b"uuid");
    v.extend_from_slice(&XMP_UUID);
    v.extend_from_slice(packet);
    v
}

fn ftyp() -> Vec<u8> {
    bx(b"ftyp", b"isom\0\0\x02\0isommp42")
}

fn packet(format: &str) -> Vec<u8> {
    format!(
        "<x:xmpmeta><rdf:Description dc:format=\"{format}\">\
         <exif:GPSLatitude>1,2N</exif:GPSLatitude>\
         </rdf:Description></x:xmpmeta>"
    )
    .into_bytes()
}

/// Absolute range of the first `needle` found in `file`.
fn span_of(file: &[u8], needle: &[u8]) -> ByteRange {
    let start = file.windows(needle.len()).position(|w| w == needle).expect("needle") as u64;
    ByteRange::new(start, start + needle.len() as u64)
}

const LATITUDE: &[u8] = b"<exif:GPSLatitude>1,2N</exif:GPSLatitude>";

/// Overwrite every range with spaces, keeping the file length.
fn blank(bytes: &[u8], ranges: &[ByteRange]) -> Vec<u8> {
    let mut out = bytes.to_vec();
    for r in ranges {
        out[r.start as usize..r.end as usize].fill(b' ');
    }
    out
}

#[test]
fn raw_packets_in_both_forms() {
    let gps = SensitiveTags::gps();
    assert_eq!(raw(ATTRIBUTE_FORM, &gps).unwrap().offsets(), RAW_ATTRIBUTE_GPS);
    assert_eq!(raw(ELEMENT_FORM, &gps).unwrap().offsets(), RAW_ELEMENT_GPS);
}

#[test]
fn ranges_cover_whole_tags() {
    let result = raw(ELEMENT_FORM, &SensitiveTags::gps()).unwrap();
    let first = result.ranges[0];
    assert_eq!(
        &ELEMENT_FORM[first.start as usize..first.end as usize],
        b"<exif:GPSAltitude>1200/100</exif:GPSAltitude>"
    );

    let result = raw(ATTRIBUTE_FORM, &SensitiveTags::gps()).unwrap();
    let last = result.ranges[3];
    assert_eq!(
        &ATTRIBUTE_FORM[last.start as usize..last.end as usize],
        br#"exif:GPSTimeStamp="2018-03-04T10:11:12Z""#
    );
}

#[test]
fn embedded_packets_report_file_offsets() {
    assert_eq!(exif(JPEG).offsets(), [769, 796, 801, 831, 836, 866, 871, 911]);
    assert_eq!(exif(TIFF).offsets(), [763, 790, 795, 825, 830, 860, 865, 905]);
    assert_eq!(iso(VIDEO).offsets(), [1569, 1614, 1618, 1666, 1670, 1719, 1723, 1782]);
    assert_eq!(iso(UUID_VIDEO).offsets(), [743, 770, 775, 805, 810, 840, 845, 885]);
}

#[test]
fn base_offset_is_added_to_packet_ranges() {
    let at_zero = scan_packet(ATTRIBUTE_FORM, 0, &SensitiveTags::gps()).unwrap();
    let shifted = scan_packet(ATTRIBUTE_FORM, 74, &SensitiveTags::gps()).unwrap();
    assert_eq!(at_zero.document, shifted.document);
    let expected: Vec<u64> = RAW_ATTRIBUTE_GPS.iter().map(|o| o + 74).collect();
    assert_eq!(shifted.offsets(), expected);
}

#[test]
fn odd_content_gives_the_same_ranges() {
    let clean = raw(ELEMENT_FORM, &SensitiveTags::gps()).unwrap();
    let odd = raw(ODD, &SensitiveTags::gps()).unwrap();
    assert_eq!(odd.ranges, clean.ranges);
    assert_eq!(odd.document, clean.document);
}

#[test]
fn malformed_content_yields_no_ranges() {
    let err = raw(MALFORMED, &SensitiveTags::gps()).unwrap_err();
    assert!(matches!(err, Error::Xml(_)), "{err}");

    let truncated = b"<x:xmpmeta><exif:GPSLatitude>1</exif:GPSLatitude>";
    let err = raw(truncated, &SensitiveTags::gps()).unwrap_err();
    assert!(matches!(err, Error::UnclosedElement(_) | Error::Xml(_)), "{err}");
}

#[test]
fn blanking_the_ranges_removes_every_tag() {
    for packet in [ATTRIBUTE_FORM, ELEMENT_FORM, ODD] {
        let before = raw(packet, &SensitiveTags::gps()).unwrap();
        let redacted = blank(packet, &before.ranges);
        assert_eq!(redacted.len(), packet.len());

        let after = raw(&redacted, &SensitiveTags::gps()).unwrap();
        assert!(after.ranges.is_empty());
        assert_eq!(after.document, before.document);
    }
}

#[test]
fn blanking_inside_containers_keeps_them_readable() {
    let before = exif(JPEG);
    let redacted = blank(JPEG, &before.ranges);
    let after = exif(&redacted);
    assert!(after.ranges.is_empty());
    assert_eq!(after.document, before.document);

    let before = iso(VIDEO);
    let redacted = blank(VIDEO, &before.ranges);
    let after = iso(&redacted);
    assert!(after.ranges.is_empty());
    assert_eq!(after.document, before.document);
}

#[test]
fn scan_file_detects_the_container() {
    let cases: [(&[u8], &[u64]); 5] = [
        (JPEG, &[769, 796, 801, 831, 836, 866, 871, 911]),
        (TIFF, &[763, 790, 795, 825, 830, 860, 865, 905]),
        (VIDEO, &[1569, 1614, 1618, 1666, 1670, 1719, 1723, 1782]),
        (UUID_VIDEO, &[743, 770, 775, 805, 810, 840, 845, 885]),
        (ATTRIBUTE_FORM, &RAW_ATTRIBUTE_GPS),
    ];
    for (bytes, expected) in cases {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(bytes).unwrap();
        let result = scan_file(tmp.path(), &SensitiveTags::default()).unwrap();
        assert_eq!(result.offsets(), expected);
        assert_eq!(result.document.format.as_deref(), Some("image/dng"));
    }
}

#[test]
fn custom_tag_names() {
    let tags = SensitiveTags::new(["xmpMM:InstanceID"]);
    assert!(tags.contains(b"InstanceID"));
    let result = raw(ATTRIBUTE_FORM, &tags).unwrap();
    assert_eq!(result.offsets(), [563, 626]);
    // the value is still reported even though the tag is redacted
    assert!(result.document.instance_id.is_some());
}

#[test]
fn tags_loaded_from_json() {
    let tags = SensitiveTags::from_json(r#"["exif:GPSLatitude", "GPSLongitude"]"#.as_bytes()).unwrap();
    let result = raw(ATTRIBUTE_FORM, &tags).unwrap();
    assert_eq!(result.offsets(), [727, 757, 762, 792]);

    assert!(SensitiveTags::from_json(r#"{"tags": 1}"#.as_bytes()).is_err());
}

#[test]
fn nested_match_is_covered_by_the_outer_range() {
    let tags = SensitiveTags::new(["DerivedFrom", "stRef:documentID"]);
    let result = raw(ELEMENT_FORM, &tags).unwrap();
    assert_eq!(result.offsets(), [764, 918]);

    let inner_only = SensitiveTags::new(["documentID"]);
    assert_eq!(raw(ELEMENT_FORM, &inner_only).unwrap().offsets(), [813, 894]);
}

#[test]
fn empty_elements_and_attributes_inside_matches() {
    let xml = br#"<x><exif:GPSLatitude/><exif:GPSLongitude a="1" /></x>"#;
    let result = raw(xml, &SensitiveTags::gps()).unwrap();
    assert_eq!(result.offsets(), [3, 22, 22, 49]);

    let xml = br#"<x><exif:GPSAltitude exif:GPSLatitude="1">x</exif:GPSAltitude><y exif:GPSSpeed='2'/></x>"#;
    let result = raw(xml, &SensitiveTags::gps()).unwrap();
    assert_eq!(result.ranges, vec![ByteRange::new(3, 62), ByteRange::new(65, 82)]);
}

#[test]
fn empty_tag_set_reports_nothing() {
    let result = raw(ELEMENT_FORM, &SensitiveTags::empty()).unwrap();
    assert!(result.ranges.is_empty());
    assert_eq!(result.document.format.as_deref(), Some("image/dng"));
}

#[test]
fn missing_packet_is_an_empty_scan() {
    let result = raw(b"", &SensitiveTags::gps()).unwrap();
    assert_eq!(result, XmpScan::default());

    let result = exif(b"\xFF\xD8\xFF\xD9");
    assert_eq!(result, XmpScan::default());
}

#[test]
fn default_tags_are_the_gps_properties() {
    let tags = SensitiveTags::default();
    assert_eq!(tags, SensitiveTags::gps());
    for name in ["GPSLatitude", "GPSLongitude", "GPSAltitude", "GPSTimeStamp"] {
        assert!(tags.contains(name.as_bytes()));
    }
    assert!(!tags.contains(b"DocumentID"));
}

#[test]
fn xmp_in_movie_udta_after_track_udta() {
    let track = bx(b"trak", &bx(b"udta", &bx(b"name", b"Video")));
    let mut movie = track;
    movie.extend(bx(b"udta", &bx(b"XMP_", &packet("video/mp4"))));
    let mut file = ftyp();
    file.extend(bx(b"moov", &movie));

    let mut index = BoxIndex::new(Cursor::new(file.clone())).unwrap();
    assert_eq!(index.box_ranges(mediaredact::known_boxes::UDTA).unwrap().len(), 2);

    let result = scan(XmpSource::iso(&mut index).unwrap(), &SensitiveTags::gps()).unwrap();
    assert_eq!(result.document.format.as_deref(), Some("video/mp4"));
    assert_eq!(result.ranges, vec![span_of(&file, LATITUDE)]);
}

#[test]
fn udta_xmp_box_wins_over_uuid_box() {
    let mut file = ftyp();
    file.extend(xmp_uuid_box(&packet("from/uuid")));
    file.extend(bx(b"moov", &bx(b"udta", &bx(b"XMP_", &packet("from/udta")))));

    let mut index = BoxIndex::new(Cursor::new(file.clone())).unwrap();
    let result = scan(XmpSource::iso(&mut index).unwrap(), &SensitiveTags::gps()).unwrap();
    assert_eq!(result.document.format.as_deref(), Some("from/udta"));

    let udta_packet = span_of(&file, b"from/udta");
    assert_eq!(result.ranges.len(), 1);
    assert!(result.ranges[0].start > udta_packet.end);
}

#[test]
fn uuid_box_is_used_when_no_udta_holds_xmp() {
    let mut file = ftyp();
    file.extend(bx(b"moov", &bx(b"udta", &bx(b"name", b"Video"))));
    file.extend(xmp_uuid_box(&packet("from/uuid")));

    let mut index = BoxIndex::new(Cursor::new(file.clone())).unwrap();
    let result = scan(XmpSource::iso(&mut index).unwrap(), &SensitiveTags::gps()).unwrap();
    assert_eq!(result.document.format.as_deref(), Some("from/uuid"));
    assert_eq!(result.ranges, vec![span_of(&file, LATITUDE)]);
}

#[test]
fn unrecognised_files_are_refused() {
    let png: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01";
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(png).unwrap();
    let err = scan_file(tmp.path(), &SensitiveTags::gps()).unwrap_err();
    assert!(matches!(err, Error::UnsupportedContainer), "{err}");

    let kind = |bytes: &[u8]| detect(&mut Cursor::new(bytes.to_vec())).unwrap();
    assert_eq!(kind(png), ContainerKind::Unknown);
    assert_eq!(kind(&b"\xEF\xBB\xBF  <?xpacket"[..]), ContainerKind::Xml);
    assert_eq!(kind(&b""[..]), ContainerKind::Xml);
    assert_eq!(kind(JPEG), ContainerKind::Jpeg);
    assert_eq!(kind(TIFF), ContainerKind::Tiff);
    assert_eq!(kind(VIDEO), ContainerKind::IsoBmff);
}
