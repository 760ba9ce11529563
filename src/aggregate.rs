use crate::error::Result;
use crate::LedgerRow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyAggregateRow {
    /// Monday that starts the bucket.
    pub week: NaiveDate,
    pub sums: BTreeMap<String, f64>,
}

impl WeeklyAggregateRow {
    pub fn get(&self, category: &str) -> Option<f64> {
        self.sums.get(category).copied()
    }
}

/// Groups rows by week and sums each requested category.
///
/// Buckets come back ascending by week regardless of input order. Blank
/// cells count as zero; a category missing from a row is an error.
pub fn aggregate_weekly<'a, I, S>(rows: I, categories: &[S]) -> Result<Vec<WeeklyAggregateRow>>
where
    I: IntoIterator<Item = &'a LedgerRow>,
    S: AsRef<str>,
{
    let mut buckets: BTreeMap<NaiveDate, BTreeMap<String, f64>> = BTreeMap::new();

    for row in rows {
        let sums = buckets.entry(row.week).or_insert_with(|| {
            categories
                .iter()
                .map(|c| (c.as_ref().to_string(), 0.0))
                .collect()
        });

        for (category, total) in sums.iter_mut() {
            *total += row.amount(category)?;
        }
    }

    Ok(buckets
        .into_iter()
        .map(|(week, sums)| WeeklyAggregateRow { week, sums })
        .collect())
}
