use crate::LedgerRow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Inclusive date window. A missing bound means "as far as the data goes".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self::new(Some(start), Some(end))
    }

    /// The whole ledger.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_reversed(&self) -> bool {
        matches!((self.start, self.end), (Some(start), Some(end)) if start > end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }

    pub fn filter<'a, I>(&self, rows: I) -> Vec<&'a LedgerRow>
    where
        I: IntoIterator<Item = &'a LedgerRow>,
    {
        filter_rows(rows, self.start, self.end)
    }
}

/// Selects rows whose date lies in `[start, end]`, preserving input order.
///
/// Omitted bounds fall back to the earliest/latest date present, so
/// `filter_rows(rows, None, None)` returns every row. A reversed range
/// yields nothing.
pub fn filter_rows<'a, I>(
    rows: I,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<&'a LedgerRow>
where
    I: IntoIterator<Item = &'a LedgerRow>,
{
    let range = DateRange::new(start, end);
    if range.is_reversed() {
        return Vec::new();
    }

    rows.into_iter().filter(|row| range.contains(row.date)).collect()
}
