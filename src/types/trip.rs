use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};

/// Inclusive travel window supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }
}

/// Input to a single planning request. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripParameters {
    /// City and country, e.g. "Lisbon, Portugal"
    pub destination: String,
    /// Budget for the whole group and the whole trip
    pub total_budget: f64,
    pub duration_days: u32,
    pub traveler_count: u32,
    /// Ordered so that anything derived from interests is deterministic
    #[serde(default)]
    pub interests: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
}

impl TripParameters {
    pub fn new(
        destination: impl Into<String>,
        total_budget: f64,
        duration_days: u32,
        traveler_count: u32,
    ) -> Self {
        Self {
            destination: destination.into(),
            total_budget,
            duration_days,
            traveler_count,
            interests: BTreeSet::new(),
            date_range: None,
        }
    }

    pub fn with_interests<I, S>(mut self, interests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interests = interests
            .into_iter()
            .map(|interest| {
                let interest: String = interest.into();
                interest.trim().to_string()
            })
            .filter(|interest| !interest.is_empty())
            .collect();
        self
    }

    pub fn with_date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = Some(DateRange::new(start, end));
        self
    }

    /// Reject parameters the pipeline cannot plan for.
    pub fn validate(&self) -> Result<()> {
        if self.destination.trim().is_empty() {
            return Err(PlannerError::InvalidRequest(
                "destination must not be empty".to_string(),
            ));
        }

        if !self.total_budget.is_finite() || self.total_budget <= 0.0 {
            return Err(PlannerError::InvalidRequest(format!(
                "totalBudget must be a positive number, got {}",
                self.total_budget
            )));
        }

        if self.duration_days == 0 {
            return Err(PlannerError::InvalidRequest(
                "durationDays must be at least 1".to_string(),
            ));
        }

        if self.traveler_count == 0 {
            return Err(PlannerError::InvalidRequest(
                "travelerCount must be at least 1".to_string(),
            ));
        }

        if let Some(range) = &self.date_range {
            if range.end < range.start {
                return Err(PlannerError::InvalidRequest(format!(
                    "dateRange ends ({}) before it starts ({})",
                    range.end, range.start
                )));
            }
        }

        Ok(())
    }

    pub fn per_day_budget(&self) -> f64 {
        self.total_budget / f64::from(self.duration_days.max(1))
    }

    pub fn per_traveler_budget(&self) -> f64 {
        self.total_budget / f64::from(self.traveler_count.max(1))
    }

    /// "day1".."dayN"
    pub fn day_keys(&self) -> Vec<String> {
        (1..=self.duration_days).map(day_key).collect()
    }

    /// Calendar date of a 1-based day, counted from the range start or `today`.
    pub fn date_for_day(&self, day: u32, today: NaiveDate) -> NaiveDate {
        let start = self.date_range.map(|range| range.start).unwrap_or(today);
        start
            .checked_add_days(Days::new(u64::from(day.saturating_sub(1))))
            .unwrap_or(start)
    }
}

pub fn day_key(day: u32) -> String {
    format!("day{}", day)
}

/// Parse "day3" (any case) into 3.
pub fn parse_day_key(key: &str) -> Option<u32> {
    let lower = key.trim().to_ascii_lowercase();
    let digits = lower.strip_prefix("day")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|day| *day > 0)
}
