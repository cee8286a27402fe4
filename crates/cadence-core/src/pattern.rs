use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Upper bound on day-by-day searches for the next occurrence, so an
/// exhausted or far-future pattern cannot loop forever.
const SEARCH_HORIZON_DAYS: i64 = 365 * 4 + 1;

/// Recurrence frequency with the fields each variant actually needs.
///
/// Weekday indices run 0=Sunday through 6=Saturday. `Biweekly` behaves like
/// `Weekly` with a week period of `2 * interval`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "frequency", rename_all = "lowercase")]
pub enum Frequency {
    Daily {
        interval: u32,
    },
    Weekly {
        interval: u32,
        days_of_week: Vec<u8>,
    },
    Biweekly {
        interval: u32,
        days_of_week: Vec<u8>,
    },
    Monthly {
        interval: u32,
        day_of_month: Option<u32>,
    },
    Yearly {
        interval: u32,
    },
}

impl Frequency {
    pub fn interval(&self) -> u32 {
        match self {
            Frequency::Daily { interval }
            | Frequency::Weekly { interval, .. }
            | Frequency::Biweekly { interval, .. }
            | Frequency::Monthly { interval, .. }
            | Frequency::Yearly { interval } => *interval,
        }
    }
}

/// The recurrence rule for a task series, independent of any concrete date.
///
/// All occurrence arithmetic is anchored at `start_date`. Dates before the
/// anchor never match; `end_date` (when set) is exclusive in the sense that
/// no occurrence falls on or after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrencePattern {
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    /// Flat exclusion set. The exception ledger supersedes an entry here
    /// when both cover the same date.
    pub excluded_dates: Vec<NaiveDate>,
}

impl RecurrencePattern {
    /// Creates a validated pattern with no end date and no exclusions.
    pub fn new(frequency: Frequency, start_date: NaiveDate) -> Result<Self, CoreError> {
        let pattern = Self {
            frequency,
            start_date,
            end_date: None,
            excluded_dates: Vec::new(),
        };
        pattern.validate()?;
        Ok(pattern)
    }

    /// Construction-time validation. Downstream consumers (the generator in
    /// particular) assume a validated pattern and do not re-check.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.frequency.interval() < 1 {
            return Err(CoreError::InvalidPattern(
                "interval must be at least 1".to_string(),
            ));
        }
        match &self.frequency {
            Frequency::Weekly { days_of_week, .. } | Frequency::Biweekly { days_of_week, .. } => {
                if let Some(day) = days_of_week.iter().find(|d| **d > 6) {
                    return Err(CoreError::InvalidPattern(format!(
                        "weekday index out of range: {day}"
                    )));
                }
            }
            Frequency::Monthly {
                day_of_month: Some(day),
                ..
            } => {
                if !(1..=31).contains(day) {
                    return Err(CoreError::InvalidPattern(format!(
                        "day of month out of range: {day}"
                    )));
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Whether `date` is a scheduled occurrence of this pattern.
    ///
    /// Pure calendar arithmetic: whole elapsed months and years are counted
    /// on the calendar rather than approximated with fixed-size day buckets,
    /// and day-of-month anchors clamp to the last day of shorter months
    /// (a day-31 monthly series falls on Feb 29 in a leap year).
    pub fn matches(&self, date: NaiveDate) -> bool {
        if date < self.start_date {
            return false;
        }
        if let Some(end) = self.end_date {
            if date >= end {
                return false;
            }
        }
        // Occurrence zero
        if date == self.start_date {
            return true;
        }

        let days_diff = (date - self.start_date).num_days();
        match &self.frequency {
            Frequency::Daily { interval } => days_diff % i64::from(*interval) == 0,
            Frequency::Weekly {
                interval,
                days_of_week,
            } => self.matches_week(date, days_diff, i64::from(*interval), days_of_week),
            Frequency::Biweekly {
                interval,
                days_of_week,
            } => self.matches_week(date, days_diff, 2 * i64::from(*interval), days_of_week),
            Frequency::Monthly {
                interval,
                day_of_month,
            } => {
                let months = months_between(self.start_date, date);
                if months % i64::from(*interval) != 0 {
                    return false;
                }
                let target = day_of_month.unwrap_or(self.start_date.day());
                date.day() == target.min(days_in_month(date.year(), date.month()))
            }
            Frequency::Yearly { interval } => {
                let years = i64::from(date.year() - self.start_date.year());
                if years % i64::from(*interval) != 0 {
                    return false;
                }
                if date.month() != self.start_date.month() {
                    return false;
                }
                let target = self.start_date.day();
                date.day() == target.min(days_in_month(date.year(), date.month()))
            }
        }
    }

    fn matches_week(
        &self,
        date: NaiveDate,
        days_diff: i64,
        week_period: i64,
        days_of_week: &[u8],
    ) -> bool {
        if (days_diff / 7) % week_period != 0 {
            return false;
        }
        let weekday = weekday_index(date);
        if days_of_week.is_empty() {
            weekday == weekday_index(self.start_date)
        } else {
            days_of_week.contains(&weekday)
        }
    }

    /// Whether `date` sits in the flat exclusion set.
    pub fn is_excluded(&self, date: NaiveDate) -> bool {
        self.excluded_dates.contains(&date)
    }

    /// First scheduled, non-excluded occurrence strictly after `date`, or
    /// `None` when the pattern has ended or nothing falls inside the search
    /// horizon.
    pub fn next_occurrence_after(&self, date: NaiveDate) -> Option<NaiveDate> {
        let mut candidate = date.succ_opt()?;
        for _ in 0..SEARCH_HORIZON_DAYS {
            if let Some(end) = self.end_date {
                if candidate >= end {
                    return None;
                }
            }
            if !self.is_excluded(candidate) && self.matches(candidate) {
                return Some(candidate);
            }
            candidate = candidate.succ_opt()?;
        }
        None
    }

    /// Next `count` occurrences strictly after `from`.
    pub fn preview_occurrences(&self, from: NaiveDate, count: usize) -> Vec<NaiveDate> {
        let mut occurrences = Vec::with_capacity(count);
        let mut cursor = from;
        while occurrences.len() < count {
            match self.next_occurrence_after(cursor) {
                Some(next) => {
                    occurrences.push(next);
                    cursor = next;
                }
                None => break,
            }
        }
        occurrences
    }

    /// Human-readable rendering of the rule, e.g. `"Weekly (Mon, Wed, Fri)"`.
    pub fn describe(&self) -> String {
        const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
        match &self.frequency {
            Frequency::Daily { interval: 1 } => "Daily".to_string(),
            Frequency::Daily { interval } => format!("Every {interval} days"),
            Frequency::Weekly {
                interval,
                days_of_week,
            } => {
                if days_of_week.is_empty() {
                    if *interval == 1 {
                        format!(
                            "Weekly ({})",
                            DAY_NAMES[weekday_index(self.start_date) as usize]
                        )
                    } else {
                        format!("Every {interval} weeks")
                    }
                } else {
                    let days: Vec<&str> = days_of_week
                        .iter()
                        .filter(|d| **d <= 6)
                        .map(|d| DAY_NAMES[*d as usize])
                        .collect();
                    format!("Weekly ({})", days.join(", "))
                }
            }
            Frequency::Biweekly { interval: 1, .. } => "Every 2 weeks".to_string(),
            Frequency::Biweekly { interval, .. } => format!("Every {} weeks", 2 * interval),
            Frequency::Monthly {
                day_of_month: Some(day),
                ..
            } => format!("Monthly (day {day})"),
            Frequency::Monthly { .. } => format!("Monthly (day {})", self.start_date.day()),
            Frequency::Yearly { .. } => format!("Yearly ({})", self.start_date.format("%B %-d")),
        }
    }

    /// Keyword-level natural-language parse ("daily", "every 2 weeks", ...).
    /// Returns `None` when no recurrence phrase is recognized.
    pub fn parse_from_text(text: &str, start_date: NaiveDate) -> Option<Self> {
        let lower = text.to_lowercase();
        // "biweekly" contains "weekly", so test the longer phrase first
        let frequency = if lower.contains("biweekly") || lower.contains("every 2 weeks") {
            Frequency::Biweekly {
                interval: 1,
                days_of_week: Vec::new(),
            }
        } else if lower.contains("daily") || lower.contains("every day") {
            Frequency::Daily { interval: 1 }
        } else if lower.contains("weekly") || lower.contains("every week") {
            Frequency::Weekly {
                interval: 1,
                days_of_week: Vec::new(),
            }
        } else if lower.contains("monthly") || lower.contains("every month") {
            Frequency::Monthly {
                interval: 1,
                day_of_month: Some(start_date.day()),
            }
        } else if lower.contains("yearly") || lower.contains("every year") {
            Frequency::Yearly { interval: 1 }
        } else {
            return None;
        };

        Some(Self {
            frequency,
            start_date,
            end_date: None,
            excluded_dates: Vec::new(),
        })
    }
}

/// Weekday index with 0=Sunday through 6=Saturday.
pub(crate) fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Whole calendar months elapsed between two dates, ignoring days.
fn months_between(start: NaiveDate, end: NaiveDate) -> i64 {
    i64::from(end.year() - start.year()) * 12
        + i64::from(end.month() as i32 - start.month() as i32)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}
