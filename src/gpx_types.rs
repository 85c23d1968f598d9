use chrono::{DateTime, Utc};

/// An owned markup subtree, kept so points can be copied verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut element = Self::new(name);
        element.children.push(XmlNode::Text(text.into()));
        element
    }

    /// Local part of the element name (`gpx:trkpt` -> `trkpt`).
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// First direct child element with the given local name.
    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.children.iter().find_map(|node| match node {
            XmlNode::Element(e) if e.local_name() == local => Some(e),
            _ => None,
        })
    }

    fn child_mut(&mut self, local: &str) -> Option<&mut XmlElement> {
        self.children.iter_mut().find_map(|node| match node {
            XmlNode::Element(e) if e.local_name() == local => Some(e),
            _ => None,
        })
    }

    /// Concatenated text of the direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                XmlNode::Text(t) => Some(t.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

pub(crate) fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

/// A single GPX point (used for trkpt and wpt).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpxPoint {
    pub element: XmlElement,
    /// Trimmed text of the `<time>` child, if any.
    pub time: Option<String>,
}

impl GpxPoint {
    pub fn from_element(element: XmlElement) -> Self {
        let time = element
            .child("time")
            .map(|t| t.text().trim().to_string())
            .filter(|t| !t.is_empty());
        Self { element, time }
    }

    pub fn name(&self) -> Option<String> {
        self.element
            .child("name")
            .map(|n| n.text().trim().to_string())
            .filter(|n| !n.is_empty())
    }

    /// Overwrite the `<name>` child, appending one when the point has none.
    pub fn set_name(&mut self, name: &str) {
        match self.element.child_mut("name") {
            Some(existing) => existing.children = vec![XmlNode::Text(name.to_string())],
            None => self
                .element
                .children
                .push(XmlNode::Element(XmlElement::with_text("name", name))),
        }
    }
}

/// A GPX track segment (<trkseg>).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GpxSegment {
    pub attributes: Vec<(String, String)>,
    pub points: Vec<GpxPoint>,
}

/// A GPX track (<trk>).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GpxTrack {
    pub name: Option<String>,
    pub attributes: Vec<(String, String)>,
    pub segments: Vec<GpxSegment>,
}

impl GpxTrack {
    pub fn point_count(&self) -> usize {
        self.segments.iter().map(|s| s.points.len()).sum()
    }
}

/// Parsed GPX data: the tracks and waypoints of one document, in document order.
#[derive(Debug, Default)]
pub struct GpxData {
    pub waypoints: Vec<GpxPoint>,
    pub tracks: Vec<GpxTrack>,
}

/// One parsed input together with the base name used for naming its entries.
#[derive(Debug)]
pub struct SourceDocument {
    pub base_name: String,
    pub data: GpxData,
}

/// Fixed document-level metadata of the merged output.
#[derive(Debug, Clone)]
pub struct GpxMetadata {
    pub name: String,
    pub link_href: String,
    pub link_text: String,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum GpxEntry {
    Track(GpxTrack),
    Waypoint(GpxPoint),
}

/// The merged output document, entries in processing order.
#[derive(Debug, Clone)]
pub struct ConsolidatedGpx {
    pub metadata: GpxMetadata,
    pub entries: Vec<GpxEntry>,
}

impl ConsolidatedGpx {
    pub fn tracks(&self) -> impl Iterator<Item = &GpxTrack> {
        self.entries.iter().filter_map(|e| match e {
            GpxEntry::Track(t) => Some(t),
            GpxEntry::Waypoint(_) => None,
        })
    }

    pub fn waypoints(&self) -> impl Iterator<Item = &GpxPoint> {
        self.entries.iter().filter_map(|e| match e {
            GpxEntry::Waypoint(w) => Some(w),
            GpxEntry::Track(_) => None,
        })
    }
}
