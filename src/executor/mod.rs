pub mod filter;
pub mod output;

use crate::catalog::Catalog;
use crate::error::Result;
use crate::query::{ParsedQuery, parse};
use crate::storage::{ColumnStore, Scanner};
use output::Row;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub code: u16,
    pub message: String,
    pub data: Data,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Data {
    pub table: String,
    pub field: Vec<String>,
    pub values: Vec<Row>,
}

impl Response {
    pub fn ok(data: Data) -> Self {
        Self {
            code: 200,
            message: "OK".to_string(),
            data,
        }
    }
}

/// Runs one query through parse → scan → filter → materialize.
#[derive(Debug, Clone)]
pub struct Executor {
    catalog: Arc<Catalog>,
    scanner: Scanner,
}

impl Executor {
    pub fn new(catalog: Arc<Catalog>, scanner: Scanner) -> Self {
        Self { catalog, scanner }
    }

    /// Grammar errors abort the query before anything is read.
    pub fn prepare(&self, src: &str) -> Result<ParsedQuery> {
        let parsed = parse(src, &self.catalog)?;
        if let Ok(json) = serde_json::to_string(&parsed) {
            tracing::debug!("Parsed query > {}", json);
        }
        Ok(parsed)
    }

    /// A table file that cannot be read is logged and the remaining stages
    /// run on an empty store.
    pub fn execute(&self, parsed: &ParsedQuery) -> Response {
        let schema = self.catalog.lookup(&parsed.table_name);

        tracing::info!("Scanning...");
        let scanned = self.scanner.scan(parsed, schema).unwrap_or_else(|e| {
            tracing::warn!("Scan of '{}' failed: {}", parsed.table_name, e);
            ColumnStore::new()
        });

        let filtered = filter::filter(scanned, &parsed.predicates, schema);
        tracing::info!("Send to Output Layer");
        let values = output::materialize(filtered, &parsed.columns);

        Response::ok(Data {
            table: parsed.table_name.clone(),
            field: output::output_fields(&parsed.columns),
            values,
        })
    }
}
