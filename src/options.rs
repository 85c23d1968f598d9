use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;

use crate::error::ConsolidateError;
use crate::filter::{ClockZone, FilterWindow};

pub const DEFAULT_DOCUMENT_NAME: &str = "Consolidated GPX Tracks and Waypoints";

/// Options for merging GPX sources.
#[derive(Debug, Clone)]
pub struct ConsolidateOptions {
    pub filter: FilterWindow,

    /// Metadata name of the merged document; left out when empty.
    pub document_name: String,

    /// Creation instant written to the metadata (default: now)
    pub created_at: Option<DateTime<Utc>>,
}

impl Default for ConsolidateOptions {
    fn default() -> Self {
        Self {
            filter: FilterWindow::default(),
            document_name: DEFAULT_DOCUMENT_NAME.to_string(),
            created_at: None,
        }
    }
}

/// Options in their textual form, as passed from JavaScript.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidateRequest {
    /// Calendar date filter, `YYYY-MM-DD`
    #[serde(default)]
    pub filter_date: Option<String>,

    /// Start of the time-of-day filter, `HH:MM`
    #[serde(default)]
    pub start_time: Option<String>,

    /// End of the time-of-day filter, `HH:MM`
    #[serde(default)]
    pub end_time: Option<String>,

    /// Evaluate filters in UTC rather than local time (default: false)
    #[serde(default)]
    pub utc: bool,

    #[serde(default)]
    pub document_name: Option<String>,
}

impl ConsolidateRequest {
    pub fn into_options(self) -> Result<ConsolidateOptions, ConsolidateError> {
        let date = self.filter_date.as_deref().map(parse_filter_date).transpose()?;
        let start = self.start_time.as_deref().map(parse_clock_time).transpose()?;
        let end = self.end_time.as_deref().map(parse_clock_time).transpose()?;
        let clock = if self.utc { ClockZone::Utc } else { ClockZone::Local };

        Ok(ConsolidateOptions {
            filter: FilterWindow::new(date, start, end).with_clock(clock),
            document_name: self
                .document_name
                .unwrap_or_else(|| DEFAULT_DOCUMENT_NAME.to_string()),
            created_at: None,
        })
    }
}

pub fn parse_filter_date(value: &str) -> Result<NaiveDate, ConsolidateError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        ConsolidateError::Configuration(format!(
            "invalid filter date '{value}', expected YYYY-MM-DD"
        ))
    })
}

pub fn parse_clock_time(value: &str) -> Result<NaiveTime, ConsolidateError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| {
        ConsolidateError::Configuration(format!("invalid time '{value}', expected HH:MM"))
    })
}
