use super::error::{QueryErr, Result};
use super::lexer::{Lexer, Token};
use crate::catalog::Catalog;
use serde::Serialize;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFunc {
    Count,
    Sum,
    Avg,
    Max,
    Min,
}

impl AggregateFunc {
    pub const ALL: [AggregateFunc; 5] = [
        AggregateFunc::Count,
        AggregateFunc::Sum,
        AggregateFunc::Avg,
        AggregateFunc::Max,
        AggregateFunc::Min,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AggregateFunc::Count => "count",
            AggregateFunc::Sum => "sum",
            AggregateFunc::Avg => "avg",
            AggregateFunc::Max => "max",
            AggregateFunc::Min => "min",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CompareOp {
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "=")]
    Eq,
}

impl CompareOp {
    /// Match priority when splitting a predicate word.
    pub const ALL: [CompareOp; 5] = [
        CompareOp::Ge,
        CompareOp::Le,
        CompareOp::Gt,
        CompareOp::Lt,
        CompareOp::Eq,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Eq => "=",
        }
    }

    pub fn holds<T: PartialOrd>(self, left: &T, right: &T) -> bool {
        match self {
            CompareOp::Ge => left >= right,
            CompareOp::Le => left <= right,
            CompareOp::Gt => left > right,
            CompareOp::Lt => left < right,
            CompareOp::Eq => left == right,
        }
    }
}

/// How the *next* predicate combines with the result accumulated so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Connector {
    And,
    Or,
    #[default]
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ColumnSpec {
    Direct { name: String },
    Aggregate { func: AggregateFunc, arg: String },
}

impl Display for ColumnSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnSpec::Direct { name } => write!(f, "{name}"),
            ColumnSpec::Aggregate { func, arg } => write!(f, "{}({arg})", func.name()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Predicate {
    pub left: String,
    pub op: CompareOp,
    pub right: String,
    pub connector: Connector,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedQuery {
    pub table_name: String,
    pub columns: Vec<ColumnSpec>,
    pub predicates: Vec<Predicate>,
}

impl ParsedQuery {
    /// Names of the directly selected columns, in select-list order.
    pub fn direct_fields(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter_map(|col| match col {
                ColumnSpec::Direct { name } => Some(name.clone()),
                ColumnSpec::Aggregate { .. } => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clause {
    Select,
    From,
    Where,
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    catalog: &'a Catalog,
}

impl<'a> Parser<'a> {
    pub fn new(lexer: Lexer<'a>, catalog: &'a Catalog) -> Result<Self> {
        if lexer.finished() {
            return Err(QueryErr::EmptyQuery);
        }
        Ok(Self { lexer, catalog })
    }

    pub fn parse(mut self) -> Result<ParsedQuery> {
        let mut clause = Clause::Select;
        let mut table_name: Option<String> = None;
        let mut columns = Vec::new();
        let mut predicates: Vec<Predicate> = Vec::new();
        let mut select_all = false;
        // 직전 토큰이 조건식이면 다음은 AND/OR 자리
        let mut expect_connector = false;
        let mut pending_connector = false;

        while let Some(token) = self.lexer.next() {
            match token {
                Token::Select => continue,
                Token::From => {
                    if clause != Clause::Select {
                        return Err(QueryErr::InvalidQuery("FROM".to_string()));
                    }
                    clause = Clause::From;
                    continue;
                }
                Token::Where => {
                    if clause != Clause::From {
                        return Err(QueryErr::InvalidQuery("WHERE".to_string()));
                    }
                    clause = Clause::Where;
                    continue;
                }
                _ => {}
            }

            match clause {
                Clause::Select => match token {
                    Token::Star => select_all = true,
                    Token::Aggregate { func, arg } => {
                        columns.push(ColumnSpec::Aggregate { func, arg })
                    }
                    Token::Ident(name) => columns.push(ColumnSpec::Direct { name }),
                    Token::And => return Err(QueryErr::ReservedKeyword("AND".to_string())),
                    Token::Or => return Err(QueryErr::ReservedKeyword("OR".to_string())),
                    other => return Err(QueryErr::InvalidQuery(describe(&other))),
                },
                Clause::From => match token {
                    Token::Ident(name) if table_name.is_none() => table_name = Some(name),
                    other => {
                        return Err(QueryErr::UnexpectedToken {
                            expected: "WHERE or end of query".to_string(),
                            found: describe(&other),
                        });
                    }
                },
                Clause::Where => match token {
                    Token::Compare { left, op, right } => {
                        if expect_connector {
                            return Err(QueryErr::MissingConnector(format!(
                                "{left}{}{right}",
                                op.symbol()
                            )));
                        }
                        predicates.push(Predicate {
                            left,
                            op,
                            right,
                            connector: Connector::None,
                        });
                        expect_connector = true;
                        pending_connector = false;
                    }
                    Token::And | Token::Or if expect_connector => {
                        // predicates is non-empty whenever a connector is expected
                        if let Some(last) = predicates.last_mut() {
                            last.connector = if token == Token::And {
                                Connector::And
                            } else {
                                Connector::Or
                            };
                        }
                        expect_connector = false;
                        pending_connector = true;
                    }
                    // AND outside the connector slot is a separator
                    Token::And => continue,
                    other => return Err(QueryErr::InvalidQuery(describe(&other))),
                },
            }
        }

        if clause == Clause::Where && predicates.is_empty() {
            return Err(QueryErr::EmptyWhere);
        }
        if pending_connector {
            return Err(QueryErr::DanglingConnector);
        }
        let table_name = table_name.ok_or(QueryErr::MissingTable)?;

        if select_all {
            let schema = self.catalog.lookup(&table_name);
            columns.extend(schema.column_names().map(|name| ColumnSpec::Direct {
                name: name.to_string(),
            }));
        }
        if columns.is_empty() {
            return Err(QueryErr::NoColumns(table_name));
        }

        Ok(ParsedQuery {
            table_name,
            columns,
            predicates,
        })
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Select => "SELECT".to_string(),
        Token::From => "FROM".to_string(),
        Token::Where => "WHERE".to_string(),
        Token::And => "AND".to_string(),
        Token::Or => "OR".to_string(),
        Token::Star => "*".to_string(),
        Token::Aggregate { func, arg } => format!("{}({arg})", func.name()),
        Token::Compare { left, op, right } => format!("{left}{}{right}", op.symbol()),
        Token::Ident(name) => name.clone(),
    }
}

/// Parses one query string against the catalog used for `*` expansion.
pub fn parse(query: &str, catalog: &Catalog) -> Result<ParsedQuery> {
    Parser::new(Lexer::new(query), catalog)?.parse()
}

#[cfg(test)]
mod test {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::builtin()
    }

    fn direct(name: &str) -> ColumnSpec {
        ColumnSpec::Direct {
            name: name.to_string(),
        }
    }

    #[test]
    fn test_simple_select() {
        let q = parse(
            "SELECT C_NAME, C_ADDRESS, C_PHONE, C_CUSTKEY FROM customer WHERE C_CUSTKEY=525",
            &catalog(),
        )
        .unwrap();
        assert_eq!(q.table_name, "customer");
        assert_eq!(
            q.columns,
            vec![
                direct("C_NAME"),
                direct("C_ADDRESS"),
                direct("C_PHONE"),
                direct("C_CUSTKEY")
            ]
        );
        assert_eq!(
            q.predicates,
            vec![Predicate {
                left: "C_CUSTKEY".to_string(),
                op: CompareOp::Eq,
                right: "525".to_string(),
                connector: Connector::None,
            }]
        );
    }

    #[test]
    fn test_deterministic() {
        let src = "SELECT a, count(b) FROM t WHERE x>=1 OR y<2";
        assert_eq!(parse(src, &catalog()), parse(src, &catalog()));
    }

    #[test]
    fn test_star_expands_in_schema_order() {
        let catalog = catalog();
        let q = parse("SELECT * FROM orders", &catalog).unwrap();
        let expected: Vec<ColumnSpec> = catalog
            .lookup("orders")
            .column_names()
            .map(direct)
            .collect();
        assert_eq!(q.columns.len(), 9);
        assert_eq!(q.columns, expected);
    }

    #[test]
    fn test_star_on_unknown_table_has_no_columns() {
        assert_eq!(
            parse("SELECT * FROM nope", &catalog()),
            Err(QueryErr::NoColumns("nope".to_string()))
        );
    }

    #[test]
    fn test_and_sets_connector_on_previous() {
        let q = parse("SELECT a FROM t WHERE x=1 AND y=2", &catalog()).unwrap();
        assert_eq!(q.predicates.len(), 2);
        assert_eq!(q.predicates[0].connector, Connector::And);
        assert_eq!(q.predicates[1].connector, Connector::None);
    }

    #[test]
    fn test_or_connector_lowercase() {
        let q = parse("select a from t where x=1 or y=2 and z=3", &catalog()).unwrap();
        let connectors: Vec<Connector> = q.predicates.iter().map(|p| p.connector).collect();
        assert_eq!(
            connectors,
            vec![Connector::Or, Connector::And, Connector::None]
        );
    }

    #[test]
    fn test_leading_and_is_skipped() {
        let q = parse("SELECT a FROM t WHERE AND x=1", &catalog()).unwrap();
        assert_eq!(q.predicates.len(), 1);
    }

    #[test]
    fn test_aggregate_columns() {
        let q = parse("SELECT count(*), avg(P_SIZE) FROM part", &catalog()).unwrap();
        assert_eq!(
            q.columns,
            vec![
                ColumnSpec::Aggregate {
                    func: AggregateFunc::Count,
                    arg: "*".to_string()
                },
                ColumnSpec::Aggregate {
                    func: AggregateFunc::Avg,
                    arg: "P_SIZE".to_string()
                },
            ]
        );
        assert!(q.direct_fields().is_empty());
        assert_eq!(q.columns[1].to_string(), "avg(P_SIZE)");
    }

    #[test]
    fn test_invalid_where_token() {
        assert_eq!(
            parse("SELECT a FROM t WHERE x", &catalog()),
            Err(QueryErr::InvalidQuery("x".to_string()))
        );
    }

    #[test]
    fn test_missing_connector() {
        assert!(matches!(
            parse("SELECT a FROM t WHERE x=1 y=2", &catalog()),
            Err(QueryErr::MissingConnector(_))
        ));
    }

    #[test]
    fn test_dangling_connector() {
        assert_eq!(
            parse("SELECT a FROM t WHERE x=1 OR", &catalog()),
            Err(QueryErr::DanglingConnector)
        );
    }

    #[test]
    fn test_or_without_predicate() {
        assert_eq!(
            parse("SELECT a FROM t WHERE OR x=1", &catalog()),
            Err(QueryErr::InvalidQuery("OR".to_string()))
        );
    }

    #[test]
    fn test_missing_table_and_empty() {
        assert_eq!(parse("SELECT a", &catalog()), Err(QueryErr::MissingTable));
        assert_eq!(parse("   ", &catalog()), Err(QueryErr::EmptyQuery));
        assert_eq!(
            parse("SELECT a FROM t WHERE", &catalog()),
            Err(QueryErr::EmptyWhere)
        );
    }

    #[test]
    fn test_second_table_token_rejected() {
        assert!(matches!(
            parse("SELECT a FROM t u", &catalog()),
            Err(QueryErr::UnexpectedToken { .. })
        ));
    }
}
