//! # Ledger Dashboard
//!
//! A library that turns a wide daily ledger export (one row per financial
//! category, one column per date) into the tidy weekly tables and range
//! totals behind a financial dashboard.
//!
//! ## Core Concepts
//!
//! - **Ledger**: the raw export, plus a `TOTAL` column that is discarded
//! - **Ledger Row**: one dated row after the reshape, with its Monday week bucket
//! - **Weekly Aggregate**: per-week sums of a chosen set of categories
//! - **Summary Totals**: the same sums collapsed over the whole date range
//! - **Views**: named category lists (Overview, Income, COGS) kept in a JSON schema
//!
//! ## Example
//!
//! ```rust,ignore
//! use ledger_dashboard::*;
//! use chrono::NaiveDate;
//!
//! let mut pipeline = LedgerPipeline::with_builtin_schema()?;
//! let range = DateRange::between(
//!     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
//! );
//!
//! let report = pipeline.view_report("Fiscal_Y2D.csv", "income", range, None)?;
//! for (category, total) in report.metrics.iter() {
//!     println!("{}: {}", category, format_currency(total));
//! }
//! ```

pub mod aggregate;
pub mod cache;
pub mod error;
pub mod filter;
pub mod loader;
pub mod report;
pub mod schema;
pub mod summary;
pub mod utils;

pub use aggregate::{aggregate_weekly, WeeklyAggregateRow};
pub use cache::{LedgerCache, SourceIdentity};
pub use error::{LedgerError, Result};
pub use filter::{filter_rows, DateRange};
pub use loader::{load_ledger, parse_ledger, parse_ledger_str};
pub use report::*;
pub use schema::*;
pub use summary::{summarize, SummaryTotals};
pub use utils::*;

use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub date: NaiveDate,
    /// Monday on or before `date`
    pub week: NaiveDate,
    /// Amount per category; `None` where the source cell was blank
    pub fields: BTreeMap<String, Option<f64>>,
}

impl LedgerRow {
    /// Amount used for summation: blank cells count as zero, unknown categories are an error.
    pub fn amount(&self, category: &str) -> Result<f64> {
        match self.fields.get(category) {
            Some(value) => Ok(value.unwrap_or(0.0)),
            None => Err(LedgerError::MissingCategory(category.to_string())),
        }
    }
}

/// The reshaped ledger. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    /// Category names after de-duplication, in source order
    pub categories: Vec<String>,
    /// One row per date column, in source column order
    pub rows: Vec<LedgerRow>,
}

impl Ledger {
    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    pub fn require_categories<S: AsRef<str>>(&self, categories: &[S]) -> Result<()> {
        match categories.iter().find(|c| !self.has_category(c.as_ref())) {
            Some(missing) => Err(LedgerError::MissingCategory(missing.as_ref().to_string())),
            None => Ok(()),
        }
    }

    /// Earliest and latest date present.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.rows.iter().map(|r| r.date).min()?;
        let last = self.rows.iter().map(|r| r.date).max()?;
        Some((first, last))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Shared load → filter → aggregate/summarize pipeline for every dashboard view.
pub struct LedgerPipeline {
    schema: LedgerSchema,
    cache: LedgerCache,
}

impl LedgerPipeline {
    pub fn new(schema: LedgerSchema) -> Result<Self> {
        schema.validate()?;
        debug!(
            "Pipeline configured with schema '{}' v{} ({} views)",
            schema.name,
            schema.version,
            schema.views.len()
        );
        Ok(Self {
            schema,
            cache: LedgerCache::new(),
        })
    }

    pub fn with_builtin_schema() -> Result<Self> {
        Self::new(LedgerSchema::builtin()?)
    }

    pub fn schema(&self) -> &LedgerSchema {
        &self.schema
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<Arc<Ledger>> {
        self.cache.get_or_load(path, &self.schema.layout)
    }

    pub fn invalidate(&mut self, path: impl AsRef<Path>) -> bool {
        self.cache.invalidate(path)
    }

    pub fn view_report(
        &mut self,
        path: impl AsRef<Path>,
        view_id: &str,
        range: DateRange,
        selection: Option<&ComponentSelection>,
    ) -> Result<ViewReport> {
        let ledger = self.load(path)?;
        let view = self
            .schema
            .view(view_id)
            .ok_or_else(|| LedgerError::Config(format!("unknown view '{}'", view_id)))?;

        let report = build_view_report(&ledger, view, range, selection)?;
        info!(
            "Built '{}' report over {} rows ({} weeks)",
            report.view_id,
            report.row_count,
            report.weekly.len()
        );
        Ok(report)
    }

    pub fn weekly<S: AsRef<str>>(
        &mut self,
        path: impl AsRef<Path>,
        range: DateRange,
        categories: &[S],
    ) -> Result<Vec<WeeklyAggregateRow>> {
        let ledger = self.load(path)?;
        ledger.require_categories(categories)?;
        aggregate_weekly(range.filter(&ledger.rows), categories)
    }

    pub fn summary<S: AsRef<str>>(
        &mut self,
        path: impl AsRef<Path>,
        range: DateRange,
        categories: &[S],
    ) -> Result<SummaryTotals> {
        let ledger = self.load(path)?;
        ledger.require_categories(categories)?;
        summarize(range.filter(&ledger.rows), categories)
    }
}
