use crate::catalog::TableSchema;
use crate::error::Result;
use crate::query::ParsedQuery;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

/// Column name to string-encoded cells. Columns read from a file share one
/// length; a column under the empty header is never counted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnStore {
    columns: BTreeMap<String, Vec<String>>,
}

impl ColumnStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.columns.insert(name.into(), values);
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Length of the longest named column. Columns can differ in length after
    /// a [`union`](Self::union).
    pub fn row_count(&self) -> usize {
        self.columns
            .iter()
            .filter(|(name, _)| !name.is_empty())
            .map(|(_, values)| values.len())
            .max()
            .unwrap_or(0)
    }

    /// Keeps only the rows at `index`, in that order. The empty-header column is dropped.
    pub fn reindex(&self, index: &[usize]) -> ColumnStore {
        let columns = self
            .columns
            .iter()
            .filter(|(name, _)| !name.is_empty())
            .map(|(name, values)| {
                let kept = index.iter().filter_map(|&i| values.get(i).cloned()).collect();
                (name.clone(), kept)
            })
            .collect();
        ColumnStore { columns }
    }

    /// Column-wise union: for each column of `self`, its cells followed by the
    /// cells of the same column in `other`, with repeated values removed per
    /// column. Rows are not kept aligned across columns.
    pub fn union(&self, other: &ColumnStore) -> ColumnStore {
        let columns = self
            .columns
            .iter()
            .map(|(name, values)| {
                let mut seen: HashSet<&String> = HashSet::new();
                let merged = values
                    .iter()
                    .chain(other.columns.get(name).into_iter().flatten())
                    .filter(|v| seen.insert(*v))
                    .cloned()
                    .collect();
                (name.clone(), merged)
            })
            .collect();
        ColumnStore { columns }
    }

    pub fn into_columns(self) -> BTreeMap<String, Vec<String>> {
        self.columns
    }
}

impl FromIterator<(String, Vec<String>)> for ColumnStore {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        ColumnStore {
            columns: iter.into_iter().collect(),
        }
    }
}

/// Loads `<table>.csv` files from a root directory into column stores.
#[derive(Debug, Clone)]
pub struct Scanner {
    root: PathBuf,
}

impl Scanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.root.join(format!("{table}.csv"))
    }

    /// Reads every schema column present in the file header. Projection is left
    /// to the output stage; columns the header does not know are skipped.
    pub fn scan(&self, query: &ParsedQuery, schema: &TableSchema) -> Result<ColumnStore> {
        let path = self.table_path(&query.table_name);
        tracing::info!("Table Name > {}", query.table_name);
        tracing::info!("Real Path > {}", path.display());
        tracing::debug!("Requested fields > {:?}", query.direct_fields());
        if schema.is_empty() {
            tracing::warn!("No schema columns for '{}', nothing will be read", query.table_name);
        }

        let file = File::open(&path)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(BufReader::new(file));
        let headers = reader.headers()?.clone();

        // (file position, column name) for headers the schema declares
        let wanted: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(_, name)| schema.column(name).is_some())
            .map(|(i, name)| (i, name.to_string()))
            .collect();
        for name in query.direct_fields() {
            if !headers.iter().any(|h| h == name) {
                tracing::warn!("Column '{}' not found in {}", name, path.display());
            }
        }

        let mut columns: Vec<Vec<String>> = vec![Vec::new(); wanted.len()];
        let mut rows = 0usize;
        for (line, record) in reader.records().enumerate() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("Skipping row {} of {}: {}", line + 1, path.display(), e);
                    continue;
                }
            };
            for ((i, _), column) in wanted.iter().zip(columns.iter_mut()) {
                column.push(record.get(*i).unwrap_or_default().to_string());
            }
            rows += 1;
        }
        tracing::info!("Complete Read {} Data", rows);

        Ok(wanted
            .into_iter()
            .map(|(_, name)| name)
            .zip(columns)
            .collect())
    }
}
