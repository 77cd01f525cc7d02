//! History filtering.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::model::RoundLog;

/// Filter on the operator-reported issues flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    /// Every round.
    #[default]
    All,
    /// Rounds with issues detected.
    Issues,
    /// Rounds without issues.
    Normal,
}

impl StatusFilter {
    fn accepts(self, round: &RoundLog) -> bool {
        match self {
            Self::All => true,
            Self::Issues => round.issues_detected,
            Self::Normal => !round.issues_detected,
        }
    }
}

/// Criteria for narrowing the round history.
///
/// Empty criteria match everything. Dates are calendar days in UTC; `since`
/// includes its whole day from midnight and `until` includes its whole day
/// up to the last millisecond.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundFilter {
    /// Case-insensitive substring over title, sector, responsible and ticket id.
    pub search: Option<String>,
    /// First day included.
    pub since: Option<NaiveDate>,
    /// Last day included.
    pub until: Option<NaiveDate>,
    /// Exact sector.
    pub sector: Option<String>,
    /// Exact responsible party.
    pub responsible: Option<String>,
    /// Issues flag filter.
    pub status: StatusFilter,
}

impl RoundFilter {
    /// Check whether a single round matches.
    #[must_use]
    pub fn matches(&self, round: &RoundLog) -> bool {
        if let Some(needle) = non_empty(self.search.as_deref()) {
            let needle = needle.to_lowercase();
            let hit = [
                Some(round.task_title.as_str()),
                Some(round.sector.as_str()),
                Some(round.responsible.as_str()),
                round.ticket_id.as_deref(),
            ]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        if let Some(since) = self.since {
            if round.start_time < start_of_day_ms(since) {
                return false;
            }
        }
        if let Some(until) = self.until {
            if round.start_time > end_of_day_ms(until) {
                return false;
            }
        }

        if non_empty(self.sector.as_deref()).is_some_and(|s| s != round.sector) {
            return false;
        }
        if non_empty(self.responsible.as_deref()).is_some_and(|r| r != round.responsible) {
            return false;
        }

        self.status.accepts(round)
    }

    /// Matching rounds sorted by start time, newest first.
    #[must_use]
    pub fn apply(&self, rounds: &[RoundLog]) -> Vec<RoundLog> {
        let mut matched: Vec<RoundLog> = rounds.iter().filter(|r| self.matches(r)).cloned().collect();
        matched.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        matched
    }
}

/// Distinct values available for the sector and responsible filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Facets {
    /// Sorted unique sectors.
    pub sectors: Vec<String>,
    /// Sorted unique responsible parties.
    pub responsibles: Vec<String>,
}

impl Facets {
    /// Collect the facets present in `rounds`.
    #[must_use]
    pub fn from_rounds(rounds: &[RoundLog]) -> Self {
        let sectors: BTreeSet<&str> = rounds.iter().map(|r| r.sector.as_str()).collect();
        let responsibles: BTreeSet<&str> = rounds.iter().map(|r| r.responsible.as_str()).collect();
        Self {
            sectors: sectors.into_iter().map(str::to_string).collect(),
            responsibles: responsibles.into_iter().map(str::to_string).collect(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn start_of_day_ms(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

fn end_of_day_ms(date: NaiveDate) -> i64 {
    date.and_hms_milli_opt(23, 59, 59, 999)
        .map_or(i64::MAX, |end| end.and_utc().timestamp_millis())
}
