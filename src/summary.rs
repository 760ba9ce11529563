use crate::error::Result;
use crate::LedgerRow;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Range totals in the order the categories were requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryTotals {
    totals: Vec<(String, f64)>,
}

impl SummaryTotals {
    pub fn get(&self, category: &str) -> Option<f64> {
        self.totals
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.totals.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    pub fn to_map(&self) -> BTreeMap<String, f64> {
        self.totals.iter().cloned().collect()
    }
}

/// Sums each requested category over every row in `rows`.
///
/// An empty input gives `0.0` for each category.
pub fn summarize<'a, I, S>(rows: I, categories: &[S]) -> Result<SummaryTotals>
where
    I: IntoIterator<Item = &'a LedgerRow>,
    S: AsRef<str>,
{
    let mut totals: Vec<(String, f64)> = Vec::with_capacity(categories.len());
    for category in categories {
        let category = category.as_ref();
        if !totals.iter().any(|(name, _)| name == category) {
            totals.push((category.to_string(), 0.0));
        }
    }

    for row in rows {
        for (category, total) in totals.iter_mut() {
            *total += row.amount(category)?;
        }
    }

    Ok(SummaryTotals { totals })
}
