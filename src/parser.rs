use quick_xml::escape::unescape;
use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::Reader;

use crate::error::GpxParseError;
use crate::gpx_types::*;

type Result<T> = std::result::Result<T, GpxParseError>;

/// Parse a GPX XML string into GpxData.
///
/// Tracks and waypoints are collected from any depth below the root, in
/// document order. Points keep their whole subtree so they can be written
/// back out unchanged.
pub fn parse_gpx(xml: &str) -> Result<GpxData> {
    let mut reader = Reader::from_str(xml);
    let mut data = GpxData::default();
    let mut open: Vec<String> = Vec::new();
    let mut seen_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if seen_root && open.is_empty() {
                    return Err(GpxParseError::OutsideRoot(format!("<{}>", element_name(&e))));
                }
                seen_root = true;
                match e.local_name().as_ref() {
                    b"trk" => data.tracks.push(parse_track(&e, &mut reader)?),
                    b"wpt" => data
                        .waypoints
                        .push(GpxPoint::from_element(read_element(&e, &mut reader)?)),
                    _ => open.push(element_name(&e)),
                }
            }
            Event::Empty(e) => {
                if seen_root && open.is_empty() {
                    return Err(GpxParseError::OutsideRoot(format!("<{}/>", element_name(&e))));
                }
                seen_root = true;
                match e.local_name().as_ref() {
                    b"trk" => data.tracks.push(GpxTrack {
                        attributes: read_attributes(&e)?,
                        ..Default::default()
                    }),
                    b"wpt" => data
                        .waypoints
                        .push(GpxPoint::from_element(element_from_start(&e)?)),
                    _ => {}
                }
            }
            Event::Text(e) if open.is_empty() => {
                let text = String::from_utf8_lossy(e.as_ref());
                let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
                if !text.is_empty() {
                    return Err(GpxParseError::OutsideRoot(format!("text {text:?}")));
                }
            }
            Event::CData(_) if open.is_empty() => {
                return Err(GpxParseError::OutsideRoot("CDATA section".to_string()));
            }
            Event::GeneralRef(e) if open.is_empty() => {
                return Err(GpxParseError::OutsideRoot(format!(
                    "reference &{};",
                    String::from_utf8_lossy(e.as_ref())
                )));
            }
            Event::GeneralRef(e) => check_reference(&e)?,
            Event::End(_) => {
                open.pop();
            }
            Event::Eof => {
                if let Some(name) = open.pop() {
                    return Err(GpxParseError::UnclosedElement(name));
                }
                if !seen_root {
                    return Err(GpxParseError::NoRootElement);
                }
                break;
            }
            _ => {}
        }
    }

    Ok(data)
}

/// Parse a <trk> element. Segments are picked up at any depth inside it.
fn parse_track<'a>(start: &BytesStart<'a>, reader: &mut Reader<&'a [u8]>) -> Result<GpxTrack> {
    let mut track = GpxTrack {
        attributes: read_attributes(start)?,
        ..Default::default()
    };
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"trkseg" => track.segments.push(parse_segment(&e, reader)?),
                b"name" if depth == 0 && track.name.is_none() => {
                    let name = read_element(&e, reader)?.text().trim().to_string();
                    if !name.is_empty() {
                        track.name = Some(name);
                    }
                }
                _ => depth += 1,
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"trkseg" {
                    track.segments.push(GpxSegment {
                        attributes: read_attributes(&e)?,
                        points: Vec::new(),
                    });
                }
            }
            Event::GeneralRef(e) => check_reference(&e)?,
            Event::End(_) if depth == 0 => break,
            Event::End(_) => depth -= 1,
            Event::Eof => return Err(GpxParseError::UnclosedElement(element_name(start))),
            _ => {}
        }
    }

    Ok(track)
}

/// Parse a <trkseg> element; points are its direct <trkpt> children.
fn parse_segment<'a>(
    start: &BytesStart<'a>,
    reader: &mut Reader<&'a [u8]>,
) -> Result<GpxSegment> {
    let mut segment = GpxSegment {
        attributes: read_attributes(start)?,
        points: Vec::new(),
    };

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"trkpt" => segment
                    .points
                    .push(GpxPoint::from_element(read_element(&e, reader)?)),
                _ => {
                    read_element(&e, reader)?;
                }
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"trkpt" {
                    segment
                        .points
                        .push(GpxPoint::from_element(element_from_start(&e)?));
                }
            }
            Event::GeneralRef(e) => check_reference(&e)?,
            Event::End(_) => break,
            Event::Eof => return Err(GpxParseError::UnclosedElement(element_name(start))),
            _ => {}
        }
    }

    Ok(segment)
}

/// Read an element and everything inside it into an owned subtree.
/// Called after receiving Event::Start for the element.
fn read_element<'a>(start: &BytesStart<'a>, reader: &mut Reader<&'a [u8]>) -> Result<XmlElement> {
    let mut element = element_from_start(start)?;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                flush_text(&mut element, &mut text);
                let child = read_element(&e, reader)?;
                element.children.push(XmlNode::Element(child));
            }
            Event::Empty(e) => {
                flush_text(&mut element, &mut text);
                element
                    .children
                    .push(XmlNode::Element(element_from_start(&e)?));
            }
            Event::Text(e) => text.push_str(&String::from_utf8_lossy(e.as_ref())),
            Event::CData(e) => text.push_str(&String::from_utf8_lossy(e.as_ref())),
            Event::GeneralRef(e) => push_reference(&mut text, &e)?,
            Event::End(_) => {
                flush_text(&mut element, &mut text);
                break;
            }
            Event::Eof => return Err(GpxParseError::UnclosedElement(element.name)),
            _ => {}
        }
    }

    Ok(element)
}

fn flush_text(element: &mut XmlElement, text: &mut String) {
    // Whitespace between elements is layout only; the writer re-indents.
    if text.trim().is_empty() {
        text.clear();
    } else {
        element.children.push(XmlNode::Text(std::mem::take(text)));
    }
}

/// Resolve character references (&#60; &#x3C;) and the predefined entities.
fn push_reference(text: &mut String, e: &BytesRef<'_>) -> Result<()> {
    if let Ok(Some(ch)) = e.resolve_char_ref() {
        text.push(ch);
        return Ok(());
    }
    let name = String::from_utf8_lossy(e.as_ref());
    match name.as_ref() {
        "amp" => text.push('&'),
        "lt" => text.push('<'),
        "gt" => text.push('>'),
        "quot" => text.push('"'),
        "apos" => text.push('\''),
        other => return Err(GpxParseError::Escape(format!("unknown entity &{other};"))),
    }
    Ok(())
}

/// Reject unknown entities in text that is not kept.
fn check_reference(e: &BytesRef<'_>) -> Result<()> {
    push_reference(&mut String::new(), e)
}

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement> {
    Ok(XmlElement {
        name: element_name(start),
        attributes: read_attributes(start)?,
        children: Vec::new(),
    })
}

fn element_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

/// Attribute values are unescaped; the writer escapes them again.
fn read_attributes(start: &BytesStart<'_>) -> Result<Vec<(String, String)>> {
    start
        .attributes()
        .map(|attr_result| {
            let attr = attr_result.map_err(|e| GpxParseError::Attribute(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let raw = String::from_utf8_lossy(&attr.value);
            let value = unescape(&raw)
                .map_err(|e| GpxParseError::Escape(e.to_string()))?
                .into_owned();
            Ok((key, value))
        })
        .collect()
}
