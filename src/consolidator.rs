use chrono::Utc;
use log::debug;
use serde::Serialize;

use crate::filter::FilterWindow;
use crate::gpx_types::*;
use crate::naming::{self, NameRegistry};
use crate::options::ConsolidateOptions;

const CREATOR_LINK_HREF: &str = "http://www.garmin.com";
const CREATOR_LINK_TEXT: &str = "Garmin International";

/// Counts of what a run kept and dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidationSummary {
    pub sources: usize,
    pub tracks_written: usize,
    pub tracks_dropped: usize,
    pub segments_written: usize,
    pub points_written: usize,
    pub points_dropped: usize,
    pub waypoints_written: usize,
    pub waypoints_dropped: usize,
}

/// Merges sources one at a time into a single output document.
///
/// Track and waypoint names come from two independent registries that live
/// for the whole run, so names stay unique across sources.
#[derive(Debug)]
pub struct Consolidator {
    options: ConsolidateOptions,
    track_names: NameRegistry,
    waypoint_names: NameRegistry,
    entries: Vec<GpxEntry>,
    summary: ConsolidationSummary,
}

impl Consolidator {
    pub fn new(options: ConsolidateOptions) -> Self {
        Self {
            options,
            track_names: NameRegistry::new(),
            waypoint_names: NameRegistry::new(),
            entries: Vec::new(),
            summary: ConsolidationSummary::default(),
        }
    }

    /// Filter and rename the tracks, then the waypoints, of one source.
    pub fn add_source(&mut self, source: SourceDocument) {
        let filter = self.options.filter;
        let base = naming::base_name(&source.base_name, filter.date);
        self.summary.sources += 1;

        for track in source.data.tracks {
            let original = track.name.clone();
            // Issued before filtering: a dropped track still uses up its name.
            let name = self.track_names.issue(&base);
            let before = track.point_count();
            let filtered = filter_track(track, name, &filter);
            let kept = filtered.point_count();
            self.summary.points_dropped += before - kept;

            if filtered.segments.is_empty() {
                debug!(
                    "{}: track {:?} has no points left after filtering",
                    source.base_name, original
                );
                self.summary.tracks_dropped += 1;
                continue;
            }

            debug!(
                "{}: track {:?} -> {:?} ({} points)",
                source.base_name, original, filtered.name, kept
            );
            self.summary.tracks_written += 1;
            self.summary.segments_written += filtered.segments.len();
            self.summary.points_written += kept;
            self.entries.push(GpxEntry::Track(filtered));
        }

        for mut waypoint in source.data.waypoints {
            if !filter.admits_waypoint(waypoint.time.as_deref()) {
                self.summary.waypoints_dropped += 1;
                continue;
            }
            let name = self.waypoint_names.issue(&base);
            debug!(
                "{}: waypoint {:?} -> {:?}",
                source.base_name,
                waypoint.name(),
                name
            );
            waypoint.set_name(&name);
            self.summary.waypoints_written += 1;
            self.entries.push(GpxEntry::Waypoint(waypoint));
        }
    }

    pub fn finish(self) -> (ConsolidatedGpx, ConsolidationSummary) {
        let metadata = GpxMetadata {
            name: self.options.document_name,
            link_href: CREATOR_LINK_HREF.to_string(),
            link_text: CREATOR_LINK_TEXT.to_string(),
            time: self.options.created_at.unwrap_or_else(Utc::now),
        };
        let document = ConsolidatedGpx {
            metadata,
            entries: self.entries,
        };
        (document, self.summary)
    }
}

/// Merge already-parsed sources in order.
pub fn consolidate(
    sources: impl IntoIterator<Item = SourceDocument>,
    options: ConsolidateOptions,
) -> (ConsolidatedGpx, ConsolidationSummary) {
    let mut consolidator = Consolidator::new(options);
    for source in sources {
        consolidator.add_source(source);
    }
    consolidator.finish()
}

/// Rebuild a track under `name`, keeping only admitted points and the
/// segments that still hold at least one of them.
pub fn filter_track(track: GpxTrack, name: String, filter: &FilterWindow) -> GpxTrack {
    let segments = track
        .segments
        .into_iter()
        .filter_map(|segment| {
            let points: Vec<GpxPoint> = segment
                .points
                .into_iter()
                .filter(|pt| filter.admits_point(pt.time.as_deref()))
                .collect();
            (!points.is_empty()).then_some(GpxSegment {
                attributes: segment.attributes,
                points,
            })
        })
        .collect();

    GpxTrack {
        name: Some(name),
        attributes: track.attributes,
        segments,
    }
}
