use crate::error::{Result, SimError};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Comparison family of a column, resolved once when the registry is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Int,
    Date,
    Text,
}

impl ColumnType {
    /// Maps a declared type (`int`, `date`, `char`, `varchar`, `decimal(15,2)`, ...)
    /// onto its comparison family.
    pub fn from_decl(decl: &str) -> Self {
        match decl.trim().to_lowercase().as_str() {
            "int" | "integer" | "bigint" => ColumnType::Int,
            "date" => ColumnType::Date,
            _ => ColumnType::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
    /// Byte width, `-1` when the width is not fixed.
    pub size: i32,
}

/// Ordered column list of one table. Names, types and sizes stay parallel
/// because they live in the same entry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableSchema {
    columns: Vec<ColumnDef>,
}

static EMPTY_SCHEMA: TableSchema = TableSchema {
    columns: Vec::new(),
};

impl TableSchema {
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        Self { columns }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.column(name).map(|c| c.ty)
    }
}

//                 table          column  type    size
type BuiltinTable = (&'static str, &'static [(&'static str, &'static str, i32)]);

const BUILTIN_TABLES: &[BuiltinTable] = &[
    (
        "employees",
        &[
            ("emp_no", "int", 8),
            ("birth_date", "date", -1),
            ("first_name", "char", 30),
            ("last_name", "char", 30),
            ("gender", "char", 1),
            ("hire_date", "date", -1),
        ],
    ),
    (
        "nation",
        &[
            ("N_NATIONKEY", "int", 8),
            ("N_NAME", "char", 25),
            ("N_REGIONKEY", "int", 8),
            ("N_COMMENT", "char", 152),
        ],
    ),
    (
        "region",
        &[
            ("R_REGIONKEY", "int", 8),
            ("R_NAME", "char", 8),
            ("R_COMMENT", "varchar", 152),
        ],
    ),
    (
        "part",
        &[
            ("P_PARTKEY", "int", 8),
            ("P_NAME", "varchar", 55),
            ("P_MFGR", "char", 25),
            ("P_BRAND", "char", 10),
            ("P_TYPE", "varchar", 25),
            ("P_SIZE", "int", 8),
            ("P_CONTAINER", "char", 10),
            ("P_RETAILPRICE", "decimal(15,2)", 15),
            ("P_COMMENT", "varchar", 101),
        ],
    ),
    (
        "supplier",
        &[
            ("S_SUPPKEY", "int", 8),
            ("S_NAME", "char", 25),
            ("S_ADDRESS", "varchar", 40),
            ("S_NATIONKEY", "int", 8),
            ("S_PHONE", "char", 15),
            ("S_ACCTBAL", "decimal(15,2)", 15),
            ("S_COMMENT", "varchar", 101),
        ],
    ),
    (
        "partsupp",
        &[
            ("PS_PARTKEY", "int", 8),
            ("PS_SUPPKEY", "int", 8),
            ("PS_AVAILQTY", "int", 8),
            ("PS_SUPPLYCOST", "decimal(15,2)", 15),
            ("PS_COMMENT", "varchar", 199),
        ],
    ),
    (
        "customer",
        &[
            ("C_CUSTKEY", "int", 8),
            ("C_NAME", "varchar", 25),
            ("C_ADDRESS", "varchar", 40),
            ("C_NATIONKEY", "int", 8),
            ("C_PHONE", "char", 15),
            ("C_ACCTBAL", "decimal(15,2)", 15),
            ("C_MKTSEGMENT", "char", 10),
            ("C_COMMENT", "varchar", 117),
        ],
    ),
    (
        "orders",
        &[
            ("O_ORDERKEY", "int", 8),
            ("O_CUSTKEY", "int", 8),
            ("O_ORDERSTATUS", "char", 1),
            ("O_TOTALPRICE", "decimal(15,2)", 15),
            ("O_ORDERDATE", "date", -1),
            ("O_ORDERPRIORITY", "char", 15),
            ("O_CLERK", "char", 15),
            ("O_SHIPPRIORITY", "int", 8),
            ("O_COMMENT", "varchar", 79),
        ],
    ),
    (
        "lineitem",
        &[
            ("L_ORDERKEY", "int", 8),
            ("L_PARTKEY", "int", 8),
            ("L_SUPPKEY", "int", 8),
            ("L_LINENUMBER", "int", 8),
            ("L_QUANTITY", "decimal(15,2)", 15),
            ("L_EXTENDEDPRICE", "decimal(15,2)", 15),
            ("L_DISCOUNT", "decimal(15,2)", 15),
            ("L_TAX", "decimal(15,2)", 15),
            ("L_RETURNFLAG", "char", 1),
            ("L_LINESTATUS", "char", 1),
            ("L_SHIPDATE", "date", -1),
            ("L_COMMITDATE", "date", -1),
            ("L_RECEIPTDATE", "date", -1),
            ("L_SHIPINSTRUCT", "char", 25),
            ("L_SHIPMODE", "char", 10),
            ("L_COMMENT", "varchar", 44),
        ],
    ),
];

#[derive(Debug, Deserialize)]
struct SchemaFile {
    tables: HashMap<String, TableDecl>,
}

#[derive(Debug, Deserialize)]
struct TableDecl {
    columns: Vec<String>,
    types: Vec<String>,
    sizes: Vec<i32>,
}

/// Read-only registry from table name to schema, built once at startup.
#[derive(Debug, Clone)]
pub struct Catalog {
    tables: HashMap<String, TableSchema>,
}

impl Catalog {
    pub fn builtin() -> Self {
        let tables = BUILTIN_TABLES
            .iter()
            .map(|(name, cols)| {
                let columns = cols
                    .iter()
                    .map(|(col, decl, size)| ColumnDef {
                        name: col.to_string(),
                        ty: ColumnType::from_decl(decl),
                        size: *size,
                    })
                    .collect();
                (name.to_string(), TableSchema::new(columns))
            })
            .collect();
        Self { tables }
    }

    pub fn from_toml(src: &str) -> Result<Self> {
        let file: SchemaFile = toml::from_str(src)?;
        let mut tables = HashMap::with_capacity(file.tables.len());
        for (name, decl) in file.tables {
            if decl.columns.len() != decl.types.len() || decl.columns.len() != decl.sizes.len() {
                return Err(SimError::Config(format!(
                    "table '{name}': columns, types and sizes must have the same length"
                )));
            }
            let columns = decl
                .columns
                .into_iter()
                .zip(decl.types)
                .zip(decl.sizes)
                .map(|((col, decl), size)| ColumnDef {
                    name: col,
                    ty: ColumnType::from_decl(&decl),
                    size,
                })
                .collect();
            tables.insert(name, TableSchema::new(columns));
        }
        Ok(Self { tables })
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Unknown tables resolve to an empty schema.
    pub fn lookup(&self, table: &str) -> &TableSchema {
        match self.tables.get(table) {
            Some(schema) => schema,
            None => {
                tracing::warn!("Unknown table '{}', using empty schema", table);
                &EMPTY_SCHEMA
            }
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
