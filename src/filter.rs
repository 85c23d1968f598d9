use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// Offset-less timestamps are read as wall-clock time in the filter's zone.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// The zone in which a timestamp's calendar date and time of day are taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClockZone {
    #[default]
    Local,
    Utc,
}

impl ClockZone {
    /// Wall-clock reading of a GPX `<time>` value, or None if it does not parse.
    pub fn civil_time(self, raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
            return Some(match self {
                ClockZone::Local => instant.with_timezone(&Local).naive_local(),
                ClockZone::Utc => instant.naive_utc(),
            });
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    }
}

/// Inclusive time-of-day range in minutes since midnight. No wrap past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDayRange {
    pub start: u32,
    pub end: u32,
}

impl TimeOfDayRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            start: minutes_of(start),
            end: minutes_of(end),
        }
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        (self.start..=self.end).contains(&minutes_of(time))
    }

    /// A start later than the end admits nothing.
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

fn minutes_of(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterWindow {
    pub date: Option<NaiveDate>,
    pub time_range: Option<TimeOfDayRange>,
    pub clock: ClockZone,
}

impl FilterWindow {
    /// The time-of-day range only takes effect when both ends are given.
    pub fn new(date: Option<NaiveDate>, start: Option<NaiveTime>, end: Option<NaiveTime>) -> Self {
        let time_range = match (start, end) {
            (Some(start), Some(end)) => Some(TimeOfDayRange::new(start, end)),
            _ => None,
        };
        Self {
            date,
            time_range,
            clock: ClockZone::default(),
        }
    }

    pub fn with_clock(mut self, clock: ClockZone) -> Self {
        self.clock = clock;
        self
    }

    pub fn is_active(&self) -> bool {
        self.date.is_some() || self.time_range.is_some()
    }

    fn matches(&self, civil: NaiveDateTime) -> bool {
        if self.date.is_some_and(|date| civil.date() != date) {
            return false;
        }
        self.time_range
            .is_none_or(|range| range.contains(civil.time()))
    }

    /// Track points: untimed points only survive when no filter is active.
    pub fn admits_point(&self, time: Option<&str>) -> bool {
        if !self.is_active() {
            return true;
        }
        time.and_then(|t| self.clock.civil_time(t))
            .is_some_and(|civil| self.matches(civil))
    }

    /// Waypoints: one without a `<time>` passes both filters, but a time that
    /// is present and unreadable never matches an active filter.
    pub fn admits_waypoint(&self, time: Option<&str>) -> bool {
        match time {
            _ if !self.is_active() => true,
            None => true,
            Some(raw) => self
                .clock
                .civil_time(raw)
                .is_some_and(|civil| self.matches(civil)),
        }
    }
}
