//! Inputs of the decision policy: business calendar and critical files

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

/// Day of the week as written in the config file
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BusinessDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<chrono::Weekday> for BusinessDay {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => BusinessDay::Monday,
            chrono::Weekday::Tue => BusinessDay::Tuesday,
            chrono::Weekday::Wed => BusinessDay::Wednesday,
            chrono::Weekday::Thu => BusinessDay::Thursday,
            chrono::Weekday::Fri => BusinessDay::Friday,
            chrono::Weekday::Sat => BusinessDay::Saturday,
            chrono::Weekday::Sun => BusinessDay::Sunday,
        }
    }
}

/// Settings that feed the conflict context
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PolicyConfig {
    /// First business hour, inclusive (0-23, local time)
    pub business_hours_start: u32,

    /// End of business hours, exclusive (1-24, local time)
    pub business_hours_end: u32,

    /// Days on which business hours apply
    pub business_days: Vec<BusinessDay>,

    /// Case-insensitive file name fragments that mark a file as critical
    pub critical_keywords: Vec<String>,

    /// Changes larger than this count as large
    pub large_change_bytes: u64,
}

impl PolicyConfig {
    /// Returns true if `hour` on `day` falls inside business hours
    pub fn is_business_time(&self, day: chrono::Weekday, hour: u32) -> bool {
        self.business_days.contains(&BusinessDay::from(day))
            && hour >= self.business_hours_start
            && hour < self.business_hours_end
    }

    /// Returns true if the file name contains a critical keyword
    pub fn is_critical_name(&self, file_name: &str) -> bool {
        let name = file_name.to_lowercase();
        self.critical_keywords
            .iter()
            .any(|keyword| name.contains(&keyword.to_lowercase()))
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            business_hours_start: 8,
            business_hours_end: 18,
            business_days: vec![
                BusinessDay::Monday,
                BusinessDay::Tuesday,
                BusinessDay::Wednesday,
                BusinessDay::Thursday,
                BusinessDay::Friday,
            ],
            critical_keywords: [
                "catalogo",
                "catalog",
                "precio",
                "pricing",
                "price",
                "stock",
                "inventario",
                "inventory",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            large_change_bytes: 512 * 1024,
        }
    }
}

impl ConfigSection for PolicyConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut results = vec![
            Validator::in_range(
                self.business_hours_start,
                0,
                23,
                "policy.business_hours_start",
            ),
            Validator::in_range(self.business_hours_end, 1, 24, "policy.business_hours_end"),
            Validator::no_blank_entries(&self.critical_keywords, "policy.critical_keywords"),
        ];

        if self.business_hours_start >= self.business_hours_end {
            results.push(Err(ValidationError::with_value(
                "policy.business_hours_end",
                "must be later than policy.business_hours_start",
                self.business_hours_end,
            )));
        }

        Validator::collect_errors(results)
    }

    fn merge(&mut self, other: Self) {
        *self = other;
    }

    fn section_name(&self) -> &'static str {
        "policy"
    }
}
