pub mod error;
pub mod lexer;
pub mod parser;

pub use lexer::Lexer;
pub use parser::{
    AggregateFunc, ColumnSpec, CompareOp, Connector, ParsedQuery, Parser, Predicate, parse,
};
