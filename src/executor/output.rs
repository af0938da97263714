use crate::query::{AggregateFunc, ColumnSpec};
use crate::storage::ColumnStore;
use std::collections::{BTreeMap, HashSet};

pub type Row = BTreeMap<String, String>;

/// Output field names in select-list order, repeated names dropped.
pub fn output_fields(columns: &[ColumnSpec]) -> Vec<String> {
    let mut seen = HashSet::new();
    columns
        .iter()
        .map(ColumnSpec::to_string)
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Turns the filtered columns back into rows.
///
/// Without aggregates one row is produced per position up to the longest
/// projected column. A column that runs out keeps repeating its last value;
/// a missing or empty column yields `""`. With any aggregate the result
/// collapses to a single row.
pub fn materialize(filtered: ColumnStore, columns: &[ColumnSpec]) -> Vec<Row> {
    tracing::info!("Prepare Output Response...");
    let fields = output_fields(columns);
    if columns
        .iter()
        .any(|col| matches!(col, ColumnSpec::Aggregate { .. }))
    {
        return vec![aggregate_row(&filtered, columns)];
    }

    let mut data = filtered.into_columns();
    let projected: Vec<(String, Vec<String>)> = fields
        .into_iter()
        .map(|field| {
            let values = data.remove(&field).unwrap_or_default();
            (field, values)
        })
        .collect();
    let row_count = projected.iter().map(|(_, v)| v.len()).max().unwrap_or(0);

    let mut rows = Vec::with_capacity(row_count);
    for i in 0..row_count {
        let row: Row = projected
            .iter()
            .map(|(field, values)| {
                let cell = values.get(i).or(values.last()).cloned().unwrap_or_default();
                (field.clone(), cell)
            })
            .collect();
        rows.push(row);
    }
    tracing::info!("Complete To Prepare Response, {} rows", rows.len());
    rows
}

fn aggregate_row(filtered: &ColumnStore, columns: &[ColumnSpec]) -> Row {
    let mut row = Row::new();
    for col in columns {
        let value = match col {
            ColumnSpec::Direct { name } => filtered
                .get(name)
                .and_then(|values| values.first().cloned())
                .unwrap_or_default(),
            ColumnSpec::Aggregate { func, arg } => aggregate(*func, arg, filtered),
        };
        row.entry(col.to_string()).or_insert(value);
    }
    row
}

/// Evaluates one aggregate over a filtered column. Numeric functions skip
/// cells that are not numbers and return `""` when nothing is left.
pub fn aggregate(func: AggregateFunc, arg: &str, filtered: &ColumnStore) -> String {
    if func == AggregateFunc::Count {
        let count = if arg == "*" {
            filtered.row_count()
        } else {
            filtered
                .get(arg)
                .map_or(0, |values| values.iter().filter(|v| !v.is_empty()).count())
        };
        return count.to_string();
    }

    let numbers: Vec<f64> = filtered
        .get(arg)
        .unwrap_or_default()
        .iter()
        .filter_map(|v| v.trim().parse::<f64>().ok())
        .collect();
    if numbers.is_empty() {
        return String::new();
    }
    let sum: f64 = numbers.iter().sum();
    let value = match func {
        AggregateFunc::Sum => sum,
        AggregateFunc::Avg => sum / numbers.len() as f64,
        AggregateFunc::Max => numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        AggregateFunc::Min => numbers.iter().copied().fold(f64::INFINITY, f64::min),
        AggregateFunc::Count => numbers.len() as f64,
    };
    value.to_string()
}
