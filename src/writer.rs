use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::ConsolidateError;
use crate::gpx_types::*;

type Result<T> = std::result::Result<T, ConsolidateError>;

pub const GPX_NAMESPACE: &str = "http://www.topografix.com/GPX/1/1";
const CREATOR: &str = "GPSMAP 64st";

/// Namespaces declared on the root so extension children of copied points stay bound.
const ROOT_NAMESPACES: &[(&str, &str)] = &[
    ("xmlns", GPX_NAMESPACE),
    ("xmlns:gpxx", "http://www.garmin.com/xmlschemas/GpxExtensions/v3"),
    ("xmlns:gpxtrkx", "http://www.garmin.com/xmlschemas/TrackStatsExtension/v1"),
    ("xmlns:wptx1", "http://www.garmin.com/xmlschemas/WaypointExtension/v1"),
    ("xmlns:gpxtpx", "http://www.garmin.com/xmlschemas/TrackPointExtension/v1"),
    ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
];

const SCHEMA_LOCATION: &str = concat!(
    "http://www.topografix.com/GPX/1/1 http://www.topografix.com/GPX/1/1/gpx.xsd ",
    "http://www.garmin.com/xmlschemas/GpxExtensions/v3 http://www8.garmin.com/xmlschemas/GpxExtensionsv3.xsd ",
    "http://www.garmin.com/xmlschemas/TrackStatsExtension/v1 http://www8.garmin.com/xmlschemas/TrackStatsExtension.xsd ",
    "http://www.garmin.com/xmlschemas/WaypointExtension/v1 http://www8.garmin.com/xmlschemas/WaypointExtensionv1.xsd ",
    "http://www.garmin.com/xmlschemas/TrackPointExtension/v1 http://www.garmin.com/xmlschemas/TrackPointExtensionv1.xsd"
);

/// Serialize the merged document, XML declaration included.
pub fn write_gpx(doc: &ConsolidatedGpx) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;

    let mut root = BytesStart::new("gpx");
    for &(key, value) in ROOT_NAMESPACES {
        root.push_attribute((key, value));
    }
    root.push_attribute(("creator", CREATOR));
    root.push_attribute(("version", "1.1"));
    root.push_attribute(("xsi:schemaLocation", SCHEMA_LOCATION));
    emit(&mut writer, Event::Start(root))?;

    write_metadata(&mut writer, &doc.metadata)?;

    for entry in &doc.entries {
        match entry {
            GpxEntry::Track(track) => write_track(&mut writer, track)?,
            GpxEntry::Waypoint(waypoint) => write_element(&mut writer, &waypoint.element)?,
        }
    }

    emit(&mut writer, Event::End(BytesEnd::new("gpx")))?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    String::from_utf8(bytes).map_err(|e| ConsolidateError::Serialize(e.to_string()))
}

fn write_metadata(writer: &mut Writer<Vec<u8>>, metadata: &GpxMetadata) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new("metadata")))?;
    if !metadata.name.is_empty() {
        write_text_element(writer, "name", &metadata.name)?;
    }

    let mut link = BytesStart::new("link");
    link.push_attribute(("href", metadata.link_href.as_str()));
    emit(writer, Event::Start(link))?;
    write_text_element(writer, "text", &metadata.link_text)?;
    emit(writer, Event::End(BytesEnd::new("link")))?;

    let time = metadata.time.format("%Y-%m-%dT%H:%M:%SZ").to_string();
    write_text_element(writer, "time", &time)?;
    emit(writer, Event::End(BytesEnd::new("metadata")))
}

fn write_track(writer: &mut Writer<Vec<u8>>, track: &GpxTrack) -> Result<()> {
    emit(writer, Event::Start(start_tag("trk", &track.attributes)))?;
    if let Some(name) = &track.name {
        write_text_element(writer, "name", name)?;
    }
    for segment in &track.segments {
        emit(writer, Event::Start(start_tag("trkseg", &segment.attributes)))?;
        for point in &segment.points {
            write_element(writer, &point.element)?;
        }
        emit(writer, Event::End(BytesEnd::new("trkseg")))?;
    }
    emit(writer, Event::End(BytesEnd::new("trk")))
}

/// Write an owned subtree back out as it was read.
fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Result<()> {
    let start = start_tag(&element.name, &element.attributes);
    if element.children.is_empty() {
        return emit(writer, Event::Empty(start));
    }

    emit(writer, Event::Start(start))?;
    for child in &element.children {
        match child {
            XmlNode::Element(e) => write_element(writer, e)?,
            XmlNode::Text(text) => emit(writer, Event::Text(BytesText::new(text)))?,
        }
    }
    emit(writer, Event::End(BytesEnd::new(element.name.as_str())))
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new(name)))?;
    emit(writer, Event::Text(BytesText::new(text)))?;
    emit(writer, Event::End(BytesEnd::new(name)))
}

fn start_tag<'a>(name: &'a str, attributes: &'a [(String, String)]) -> BytesStart<'a> {
    let mut start = BytesStart::new(name);
    for (key, value) in attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    start
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| ConsolidateError::Serialize(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consolidator::consolidate;
    use crate::options::ConsolidateOptions;
    use crate::parser::parse_gpx;
    use chrono::{TimeZone, Utc};

    fn options() -> ConsolidateOptions {
        ConsolidateOptions {
            created_at: Utc.with_ymd_and_hms(2024, 7, 4, 12, 30, 0).single(),
            ..Default::default()
        }
    }

    fn merge(base: &str, xml: &str) -> String {
        let source = SourceDocument {
            base_name: base.to_string(),
            data: parse_gpx(xml).unwrap(),
        };
        let (doc, _) = consolidate([source], options());
        write_gpx(&doc).unwrap()
    }

    #[test]
    fn test_empty_document_header_and_metadata() {
        let (doc, _) = consolidate(Vec::new(), options());
        let out = write_gpx(&doc).unwrap();
        assert!(out.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(out.contains(r#"xmlns="http://www.topografix.com/GPX/1/1""#));
        assert!(out.contains(r#"creator="GPSMAP 64st""#));
        assert!(out.contains(r#"version="1.1""#));
        assert!(out.contains("<name>Consolidated GPX Tracks and Waypoints</name>"));
        assert!(out.contains(r#"<link href="http://www.garmin.com">"#));
        assert!(out.contains("<text>Garmin International</text>"));
        assert!(out.contains("<time>2024-07-04T12:30:00Z</time>"));
        assert!(out.trim_end().ends_with("</gpx>"));
    }

    #[test]
    fn test_empty_document_name_omitted() {
        let (doc, _) = consolidate(
            Vec::new(),
            ConsolidateOptions {
                document_name: String::new(),
                ..options()
            },
        );
        let out = write_gpx(&doc).unwrap();
        assert!(!out.contains("<name>"));
    }

    #[test]
    fn test_point_copied_verbatim() {
        let out = merge(
            "ride",
            r#"<gpx><trk><name>Old</name><trkseg>
  <trkpt lat="35.5" lon="139.25"><ele>12.5</ele><time>2024-07-04T08:00:00Z</time>
    <extensions><gpxtpx:TrackPointExtension><gpxtpx:hr>150</gpxtpx:hr></gpxtpx:TrackPointExtension></extensions>
  </trkpt>
</trkseg></trk></gpx>"#,
        );
        assert!(out.contains("<name>ride_NoDate</name>"));
        assert!(!out.contains("Old"));
        assert!(out.contains(r#"<trkpt lat="35.5" lon="139.25">"#));
        assert!(out.contains("<ele>12.5</ele>"));
        assert!(out.contains("<gpxtpx:hr>150</gpxtpx:hr>"));

        let reparsed = parse_gpx(&out).unwrap();
        let point = &reparsed.tracks[0].segments[0].points[0];
        assert_eq!(point.time.as_deref(), Some("2024-07-04T08:00:00Z"));
    }

    #[test]
    fn test_text_and_attributes_escaped() {
        let out = merge(
            "cafe",
            r#"<gpx><wpt lat="1" lon="2" note="a &lt; b"><desc>Fish &amp; Chips</desc></wpt></gpx>"#,
        );
        assert!(out.contains("Fish &amp; Chips"));
        let reparsed = parse_gpx(&out).unwrap();
        let wpt = &reparsed.waypoints[0];
        assert_eq!(wpt.element.attribute("note"), Some("a < b"));
        assert_eq!(wpt.element.child("desc").unwrap().text(), "Fish & Chips");
        assert_eq!(wpt.name().as_deref(), Some("cafe_NoDate"));
    }

    #[test]
    fn test_empty_point_written_self_closing() {
        let out = merge(
            "p",
            r#"<gpx><trk><trkseg><trkpt lat="1" lon="2"/></trkseg></trk></gpx>"#,
        );
        assert!(out.contains(r#"<trkpt lat="1" lon="2"/>"#));
    }
}
