use crate::error::{LedgerError, Result};
use crate::schema::{DuplicatePolicy, LedgerLayout};
use crate::utils::{parse_amount, parse_date_label, week_start};
use crate::{Ledger, LedgerRow};
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Read;
use std::path::Path;

/// One category line of the raw ledger, values in date-column order.
struct CategoryLine {
    name: String,
    values: Vec<Option<f64>>,
}

struct DateColumn {
    index: usize,
    label: String,
    date: NaiveDate,
}

/// Reads a wide ledger export from disk and reshapes it into one row per date.
pub fn load_ledger(path: impl AsRef<Path>, layout: &LedgerLayout) -> Result<Ledger> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| LedgerError::SourceNotFound {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("Read {} bytes of ledger source from {}", bytes.len(), path.display());
    parse_ledger(bytes.as_slice(), layout)
}

pub fn parse_ledger_str(content: &str, layout: &LedgerLayout) -> Result<Ledger> {
    parse_ledger(content.as_bytes(), layout)
}

pub fn parse_ledger<R: Read>(reader: R, layout: &LedgerLayout) -> Result<Ledger> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut records = csv_reader.records();

    let header = match records.next() {
        Some(record) => record.map_err(csv_parse_error)?,
        None => {
            return Err(LedgerError::SchemaError(
                "ledger source is empty; expected a header row of date labels".to_string(),
            ))
        }
    };

    let date_columns = resolve_date_columns(&header, layout)?;

    let mut lines = Vec::new();
    for record in records {
        let record = record.map_err(csv_parse_error)?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        lines.push(read_category_line(&record, header.len(), &date_columns)?);
    }

    let lines = deduplicate(lines, layout.duplicate_policy);
    let ledger = transpose(&date_columns, lines);

    if !ledger.rows.windows(2).all(|pair| pair[0].date < pair[1].date) {
        warn!("Ledger date columns are not in chronological order");
    }
    info!(
        "Loaded ledger with {} dated rows and {} categories",
        ledger.rows.len(),
        ledger.categories.len()
    );

    Ok(ledger)
}

fn resolve_date_columns(header: &csv::StringRecord, layout: &LedgerLayout) -> Result<Vec<DateColumn>> {
    if header.len() < 2 {
        return Err(LedgerError::SchemaError(format!(
            "expected a category key column followed by date columns, found {} column(s)",
            header.len()
        )));
    }

    let aggregate = layout.aggregate_column.trim();
    let aggregate_index = header
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, label)| label.trim() == aggregate)
        .map(|(idx, _)| idx)
        .ok_or_else(|| {
            LedgerError::SchemaError(format!("aggregate column '{}' not found in header", aggregate))
        })?;

    let mut seen_dates = HashSet::new();
    let mut columns = Vec::new();
    for (index, label) in header.iter().enumerate().skip(1) {
        if index == aggregate_index {
            continue;
        }

        let date = parse_date_label(label, &layout.date_format).map_err(|e| match e {
            LedgerError::ParseError { details, .. } => LedgerError::ParseError {
                location: format!("header column {} ('{}')", index + 1, label.trim()),
                details,
            },
            other => other,
        })?;

        if !seen_dates.insert(date) {
            return Err(LedgerError::SchemaError(format!(
                "date {} appears in more than one column",
                date
            )));
        }

        columns.push(DateColumn {
            index,
            label: label.trim().to_string(),
            date,
        });
    }

    if columns.is_empty() {
        return Err(LedgerError::SchemaError(
            "ledger header contains no date columns".to_string(),
        ));
    }

    Ok(columns)
}

fn read_category_line(
    record: &csv::StringRecord,
    header_len: usize,
    date_columns: &[DateColumn],
) -> Result<CategoryLine> {
    let line = record.position().map(|p| p.line()).unwrap_or_default();

    if record.len() > header_len {
        return Err(LedgerError::SchemaError(format!(
            "line {} has {} fields but the header has {}",
            line,
            record.len(),
            header_len
        )));
    }

    let name = record.get(0).unwrap_or_default().trim();
    if name.is_empty() {
        return Err(LedgerError::SchemaError(format!(
            "line {} has values but no category name",
            line
        )));
    }

    let values = date_columns
        .iter()
        .map(|column| {
            let raw = record.get(column.index).unwrap_or_default();
            parse_amount(raw).map_err(|details| {
                LedgerError::parse(
                    format!("category '{}' on '{}' (line {})", name, column.label, line),
                    details,
                )
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CategoryLine {
        name: name.to_string(),
        values,
    })
}

/// Collapses repeated category names to a single line, keeping the source
/// position of the retained occurrence.
fn deduplicate(lines: Vec<CategoryLine>, policy: DuplicatePolicy) -> Vec<CategoryLine> {
    let mut keep_index: HashMap<&str, usize> = HashMap::new();
    for (idx, line) in lines.iter().enumerate() {
        match policy {
            DuplicatePolicy::KeepLast => {
                if let Some(previous) = keep_index.insert(line.name.as_str(), idx) {
                    debug!(
                        "Category '{}' repeats (lines #{} and #{}); keeping the later one",
                        line.name, previous, idx
                    );
                }
            }
            DuplicatePolicy::KeepFirst => {
                if let Some(first) = keep_index.get(line.name.as_str()) {
                    debug!(
                        "Category '{}' repeats (lines #{} and #{}); keeping the earlier one",
                        line.name, first, idx
                    );
                } else {
                    keep_index.insert(line.name.as_str(), idx);
                }
            }
        }
    }

    let retained: HashSet<usize> = keep_index.into_values().collect();
    lines
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| retained.contains(idx))
        .map(|(_, line)| line)
        .collect()
}

fn transpose(date_columns: &[DateColumn], lines: Vec<CategoryLine>) -> Ledger {
    let rows = date_columns
        .iter()
        .enumerate()
        .map(|(position, column)| {
            let fields: BTreeMap<String, Option<f64>> = lines
                .iter()
                .map(|line| (line.name.clone(), line.values[position]))
                .collect();

            LedgerRow {
                date: column.date,
                week: week_start(column.date),
                fields,
            }
        })
        .collect();

    Ledger {
        categories: lines.into_iter().map(|line| line.name).collect(),
        rows,
    }
}

fn csv_parse_error(err: csv::Error) -> LedgerError {
    let location = match err.position() {
        Some(pos) => format!("line {}", pos.line()),
        None => "ledger source".to_string(),
    };
    LedgerError::parse(location, err.to_string())
}
