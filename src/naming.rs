use std::collections::HashMap;

use chrono::NaiveDate;

const NO_DATE_TAG: &str = "NoDate";

/// Issues unique names per base name: `base`, then `base_2`, `base_3`, ...
#[derive(Debug, Default)]
pub struct NameRegistry {
    issued: HashMap<String, u32>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, base: &str) -> String {
        match self.issued.get_mut(base) {
            Some(count) => {
                *count += 1;
                format!("{base}_{count}")
            }
            None => {
                self.issued.insert(base.to_string(), 1);
                base.to_string()
            }
        }
    }
}

/// `Jan05` style tag for a filter date, `NoDate` without one.
pub fn date_tag(date: Option<NaiveDate>) -> String {
    match date {
        Some(date) => date.format("%b%d").to_string(),
        None => NO_DATE_TAG.to_string(),
    }
}

pub fn base_name(source_base: &str, date: Option<NaiveDate>) -> String {
    format!("{source_base}_{}", date_tag(date))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_tag() {
        assert_eq!(date_tag(None), "NoDate");
        assert_eq!(date_tag(NaiveDate::from_ymd_opt(2024, 1, 5)), "Jan05");
        assert_eq!(date_tag(NaiveDate::from_ymd_opt(2024, 7, 4)), "Jul04");
        assert_eq!(date_tag(NaiveDate::from_ymd_opt(2025, 12, 31)), "Dec31");
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("morning", None), "morning_NoDate");
        assert_eq!(
            base_name("morning", NaiveDate::from_ymd_opt(2024, 7, 4)),
            "morning_Jul04"
        );
    }

    #[test]
    fn test_issue_sequence() {
        let mut registry = NameRegistry::new();
        assert_eq!(registry.issue("track_NoDate"), "track_NoDate");
        assert_eq!(registry.issue("track_NoDate"), "track_NoDate_2");
        assert_eq!(registry.issue("track2_NoDate"), "track2_NoDate");
        assert_eq!(registry.issue("track_NoDate"), "track_NoDate_3");
    }

    #[test]
    fn test_issued_names_are_distinct() {
        let mut registry = NameRegistry::new();
        let names: Vec<String> = (0..50).map(|_| registry.issue("a_NoDate")).collect();
        let unique: std::collections::HashSet<&String> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
        assert_eq!(names[49], "a_NoDate_50");
    }
}
