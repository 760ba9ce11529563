use crate::aggregate::{aggregate_weekly, WeeklyAggregateRow};
use crate::error::{LedgerError, Result};
use crate::filter::DateRange;
use crate::schema::{ViewDefinition, ViewKind};
use crate::summary::{summarize, SummaryTotals};
use crate::Ledger;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;

/// Chosen members per component group, keyed by group title.
/// Groups without an entry show every member.
pub type ComponentSelection = BTreeMap<String, Vec<String>>;

/// The date window a report actually covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub title: String,
    /// One line per category, read from the weekly table.
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewReport {
    pub view_id: String,
    pub title: String,
    pub kind: ViewKind,
    pub range: ResolvedRange,
    pub row_count: usize,
    pub metrics: SummaryTotals,
    pub weekly: Vec<WeeklyAggregateRow>,
    pub charts: Vec<ChartSeries>,
}

impl ViewReport {
    /// Weekly values of one category, ready to plot.
    pub fn series(&self, category: &str) -> Vec<(NaiveDate, f64)> {
        self.weekly
            .iter()
            .filter_map(|row| row.get(category).map(|value| (row.week, value)))
            .collect()
    }
}

pub fn build_view_report(
    ledger: &Ledger,
    view: &ViewDefinition,
    range: DateRange,
    selection: Option<&ComponentSelection>,
) -> Result<ViewReport> {
    let referenced = view.referenced_categories();
    ledger.require_categories(&referenced)?;

    let charts = chart_series(view, selection)?;

    let rows = range.filter(&ledger.rows);
    let metrics = summarize(rows.iter().copied(), &view.metrics)?;
    let weekly = aggregate_weekly(rows.iter().copied(), &view.weekly_categories())?;

    Ok(ViewReport {
        view_id: view.id.clone(),
        title: view.title.clone(),
        kind: view.kind,
        range: resolve_range(ledger, range),
        row_count: rows.len(),
        metrics,
        weekly,
        charts,
    })
}

fn chart_series(view: &ViewDefinition, selection: Option<&ComponentSelection>) -> Result<Vec<ChartSeries>> {
    if let Some(selection) = selection {
        if let Some(unknown) = selection.keys().find(|title| view.component_group(title).is_none()) {
            return Err(LedgerError::Config(format!(
                "view '{}' has no component group titled '{}'",
                view.id, unknown
            )));
        }
    }

    let mut charts: Vec<ChartSeries> = view
        .trends
        .iter()
        .map(|trend| ChartSeries {
            title: trend.title.clone(),
            categories: vec![trend.category.clone()],
        })
        .collect();

    for group in &view.component_groups {
        let chosen = match selection.and_then(|s| s.get(&group.title)) {
            Some(chosen) => {
                if let Some(stray) = chosen.iter().find(|c| !group.categories.contains(c)) {
                    return Err(LedgerError::Config(format!(
                        "'{}' is not a member of component group '{}'",
                        stray, group.title
                    )));
                }
                // Keep the group's own ordering for the legend.
                group
                    .categories
                    .iter()
                    .filter(|c| chosen.contains(c))
                    .cloned()
                    .collect()
            }
            None => group.categories.clone(),
        };

        charts.push(ChartSeries {
            title: group.title.clone(),
            categories: chosen,
        });
    }

    Ok(charts)
}

fn resolve_range(ledger: &Ledger, range: DateRange) -> ResolvedRange {
    let span = ledger.date_span();
    ResolvedRange {
        start: range.start.or(span.map(|(first, _)| first)),
        end: range.end.or(span.map(|(_, last)| last)),
    }
}

/// Writes the weekly table as CSV: a `Week` column followed by one column per category.
pub fn write_weekly_csv<W, S>(rows: &[WeeklyAggregateRow], categories: &[S], writer: W) -> Result<()>
where
    W: Write,
    S: AsRef<str>,
{
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec!["Week".to_string()];
    header.extend(categories.iter().map(|c| c.as_ref().to_string()));
    csv_writer.write_record(&header)?;

    for row in rows {
        let mut record = vec![row.week.format("%Y-%m-%d").to_string()];
        for category in categories {
            let value = row
                .get(category.as_ref())
                .ok_or_else(|| LedgerError::MissingCategory(category.as_ref().to_string()))?;
            record.push(format!("{:.2}", value));
        }
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_ledger_str;
    use crate::schema::{ComponentGroup, LedgerLayout, TrendChart};

    const SOURCE: &str = "\
,\"Jan 1, 24\",\"Jan 3, 24\",\"Jan 8, 24\",TOTAL
Total Income,100,20,50,170
Fuel,10,,5,15
ABC,1,2,3,6
Cold Mix,4,5,6,15
";

    fn ledger() -> Ledger {
        parse_ledger_str(SOURCE, &LedgerLayout::default()).unwrap()
    }

    fn view() -> ViewDefinition {
        ViewDefinition {
            id: "cogs".to_string(),
            title: "Cost of Goods Sold Breakdown".to_string(),
            kind: ViewKind::Cogs,
            metrics: vec!["Total Income".to_string(), "Fuel".to_string()],
            trends: vec![TrendChart {
                title: "Weekly Fuel Over Time".to_string(),
                category: "Fuel".to_string(),
            }],
            component_groups: vec![ComponentGroup {
                title: "Weekly Material Components Over Time".to_string(),
                categories: vec!["ABC".to_string(), "Cold Mix".to_string()],
            }],
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_report_for_full_range() {
        let report = build_view_report(&ledger(), &view(), DateRange::all(), None).unwrap();
        assert_eq!(report.row_count, 3);
        assert_eq!(report.metrics.get("Total Income"), Some(170.0));
        assert_eq!(report.metrics.get("Fuel"), Some(15.0));
        assert_eq!(report.weekly.len(), 2);
        assert_eq!(report.series("ABC"), vec![(date(2024, 1, 1), 3.0), (date(2024, 1, 8), 3.0)]);
        assert_eq!(
            report.range,
            ResolvedRange {
                start: Some(date(2024, 1, 1)),
                end: Some(date(2024, 1, 8))
            }
        );
        assert_eq!(report.charts.len(), 2);
        assert_eq!(report.charts[1].categories, vec!["ABC", "Cold Mix"]);
    }

    #[test]
    fn test_selection_narrows_component_chart() {
        let selection = ComponentSelection::from([(
            "Weekly Material Components Over Time".to_string(),
            vec!["Cold Mix".to_string()],
        )]);
        let report = build_view_report(&ledger(), &view(), DateRange::all(), Some(&selection)).unwrap();
        assert_eq!(report.charts[1].categories, vec!["Cold Mix"]);
        // The weekly table still carries every group member.
        assert_eq!(report.weekly[0].get("ABC"), Some(3.0));
    }

    #[test]
    fn test_selection_outside_group_rejected() {
        let selection = ComponentSelection::from([(
            "Weekly Material Components Over Time".to_string(),
            vec!["Fuel".to_string()],
        )]);
        let err = build_view_report(&ledger(), &view(), DateRange::all(), Some(&selection)).unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));

        let unknown = ComponentSelection::from([("Nope".to_string(), vec![])]);
        assert!(build_view_report(&ledger(), &view(), DateRange::all(), Some(&unknown)).is_err());
    }

    #[test]
    fn test_empty_range_still_checks_categories() {
        let mut view = view();
        view.metrics.push("Landfill Fees".to_string());
        let range = DateRange::between(date(2030, 1, 1), date(2030, 2, 1));
        let err = build_view_report(&ledger(), &view, range, None).unwrap_err();
        assert!(matches!(err, LedgerError::MissingCategory(name) if name == "Landfill Fees"));
    }

    #[test]
    fn test_empty_range_zero_metrics() {
        let range = DateRange::between(date(2030, 1, 1), date(2030, 2, 1));
        let report = build_view_report(&ledger(), &view(), range, None).unwrap();
        assert_eq!(report.row_count, 0);
        assert!(report.weekly.is_empty());
        assert_eq!(report.metrics.get("Total Income"), Some(0.0));
        assert_eq!(report.range.start, Some(date(2030, 1, 1)));
    }

    #[test]
    fn test_write_weekly_csv() {
        let report = build_view_report(&ledger(), &view(), DateRange::all(), None).unwrap();
        let mut out = Vec::new();
        write_weekly_csv(&report.weekly, &["Fuel", "ABC"], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "Week,Fuel,ABC\n2024-01-01,10.00,3.00\n2024-01-08,5.00,3.00\n");
    }
}
