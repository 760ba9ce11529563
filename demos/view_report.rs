//! Prints one dashboard view for a ledger export.
//!
//! Usage: cargo run --example view_report -- <ledger.csv> [view] [start YYYY-MM-DD] [end YYYY-MM-DD]

use anyhow::{bail, Context};
use chrono::NaiveDate;
use ledger_dashboard::{format_currency, DateRange, LedgerPipeline};

fn parse_bound(arg: Option<&String>) -> anyhow::Result<Option<NaiveDate>> {
    arg.map(|raw| {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("invalid date '{}'", raw))
    })
    .transpose()
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(source) = args.first() else {
        bail!("usage: view_report <ledger.csv> [view] [start] [end]");
    };
    let view_id = args.get(1).map(String::as_str).unwrap_or("overview");
    let range = DateRange::new(parse_bound(args.get(2))?, parse_bound(args.get(3))?);

    let mut pipeline = LedgerPipeline::with_builtin_schema()?;
    let report = pipeline
        .view_report(source, view_id, range, None)
        .with_context(|| format!("building '{}' view from {}", view_id, source))?;

    println!("{}", report.title);
    match (report.range.start, report.range.end) {
        (Some(start), Some(end)) => println!("{} to {} ({} days of data)", start, end, report.row_count),
        _ => println!("No dated rows in ledger"),
    }
    println!();

    for (category, total) in report.metrics.iter() {
        println!("  {:<40} {:>16}", category, format_currency(total));
    }

    for chart in &report.charts {
        println!("\n{}", chart.title);
        for row in &report.weekly {
            let values: Vec<String> = chart
                .categories
                .iter()
                .filter_map(|c| row.get(c).map(format_currency))
                .collect();
            println!("  {}  {}", row.week, values.join("  "));
        }
    }

    Ok(())
}
