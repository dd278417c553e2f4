// Daily metric series.
// Normalizes event timestamps to calendar days and keeps one sorted row per day.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};

use super::kind::MetricKind;

/// Events attributed to a single calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub value: u64,
}

impl DailyCount {
    pub fn new(date: NaiveDate, value: u64) -> Self {
        Self { date, value }
    }
}

/// Time series of daily counts for one metric of one repository.
///
/// Rows are always sorted by date with no date repeated. An empty series still
/// carries its kind, so the value column is known even with zero rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSeries {
    kind: MetricKind,
    rows: Vec<DailyCount>,
}

impl MetricSeries {
    /// A series with no rows.
    pub fn empty(kind: MetricKind) -> Self {
        Self {
            kind,
            rows: Vec::new(),
        }
    }

    /// Build a series from arbitrary rows. When a date repeats, the later row wins.
    pub fn from_rows(kind: MetricKind, rows: impl IntoIterator<Item = DailyCount>) -> Self {
        let by_date: BTreeMap<NaiveDate, u64> =
            rows.into_iter().map(|row| (row.date, row.value)).collect();
        Self::from_map(kind, by_date)
    }

    fn from_map(kind: MetricKind, by_date: BTreeMap<NaiveDate, u64>) -> Self {
        Self {
            kind,
            rows: by_date
                .into_iter()
                .map(|(date, value)| DailyCount { date, value })
                .collect(),
        }
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn rows(&self) -> &[DailyCount] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|row| row.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|row| row.date)
    }

    /// Whether the stored dates span the whole `[start, end]` window.
    pub fn covers(&self, start: NaiveDate, end: NaiveDate) -> bool {
        match (self.first_date(), self.last_date()) {
            (Some(first), Some(last)) => first <= start && last >= end,
            _ => false,
        }
    }

    /// Union with a freshly fetched series. Fresh values replace cached ones on the same date.
    pub fn merge(&self, fresh: &MetricSeries) -> MetricSeries {
        let mut by_date: BTreeMap<NaiveDate, u64> =
            self.rows.iter().map(|row| (row.date, row.value)).collect();
        for row in &fresh.rows {
            by_date.insert(row.date, row.value);
        }
        Self::from_map(self.kind, by_date)
    }
}

/// Accumulates events into per-day counts while a fetch is paginating.
#[derive(Debug)]
pub struct DailyTally {
    kind: MetricKind,
    counts: BTreeMap<NaiveDate, u64>,
    events: usize,
}

impl DailyTally {
    pub fn new(kind: MetricKind) -> Self {
        Self {
            kind,
            counts: BTreeMap::new(),
            events: 0,
        }
    }

    /// Record `amount` on `date`.
    pub fn add(&mut self, date: NaiveDate, amount: u64) {
        *self.counts.entry(date).or_insert(0) += amount;
        self.events += 1;
    }

    /// Record one event at a raw timestamp. Unparseable timestamps are skipped.
    pub fn add_timestamp(&mut self, raw: Option<&str>) {
        if let Some(date) = raw.and_then(to_date) {
            self.add(date, 1);
        }
    }

    /// Number of events recorded so far.
    pub fn events(&self) -> usize {
        self.events
    }

    pub fn into_series(self) -> MetricSeries {
        MetricSeries::from_map(self.kind, self.counts)
    }
}

/// Convert an RFC 3339 timestamp to its UTC calendar day.
pub fn to_date(raw: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|ts| ts.with_timezone(&Utc).date_naive())
}
