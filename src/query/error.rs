use thiserror::Error;

pub type Result<T> = std::result::Result<T, QueryErr>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryErr {
    #[error("empty query")]
    EmptyQuery,
    #[error("invalid query: unexpected token '{0}'")]
    InvalidQuery(String),
    #[error("reserved keyword '{0}' used as a name")]
    ReservedKeyword(String),
    #[error("expected {expected}, found '{found}'")]
    UnexpectedToken { expected: String, found: String },
    #[error("missing table name after FROM")]
    MissingTable,
    #[error("no columns selected from table '{0}'")]
    NoColumns(String),
    #[error("WHERE clause has no predicates")]
    EmptyWhere,
    #[error("missing AND/OR before predicate '{0}'")]
    MissingConnector(String),
    #[error("AND/OR is not followed by a predicate")]
    DanglingConnector,
}
