use crate::catalog::{ColumnType, TableSchema};
use crate::query::{CompareOp, Connector, Predicate};
use crate::storage::ColumnStore;
use chrono::NaiveDate;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Applies a WHERE chain left to right. The connector stored on predicate `i`
/// decides how predicate `i + 1` is combined:
/// `AND` filters the rows that survived so far, `OR` filters the unfiltered
/// store and merges with [`ColumnStore::union`].
pub fn filter(store: ColumnStore, predicates: &[Predicate], schema: &TableSchema) -> ColumnStore {
    let Some(first) = predicates.first() else {
        tracing::info!("Nothing to Filter");
        return store;
    };

    let mut current = check_predicate(first, schema, &store);
    for pair in predicates.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        current = match prev.connector {
            Connector::And => check_predicate(next, schema, &current),
            Connector::Or => check_predicate(next, schema, &store).union(&current),
            Connector::None => break,
        };
    }
    tracing::info!("Complete Filter {}", current.row_count());
    current
}

/// Rows of `store` satisfying one predicate. Unknown columns and cells that do
/// not parse as the column type are left out of the result.
pub fn check_predicate(pred: &Predicate, schema: &TableSchema, store: &ColumnStore) -> ColumnStore {
    let Some(ty) = schema.column_type(&pred.left) else {
        tracing::warn!("Column '{}' is not in the table schema", pred.left);
        return store.reindex(&[]);
    };
    let cells = store.get(&pred.left).unwrap_or_default();
    let index = match ty {
        ColumnType::Int => select_rows(cells, pred.op, parse_int(&pred.right), parse_int),
        ColumnType::Date => select_rows(
            cells,
            pred.op,
            strip_quotes(&pred.right).and_then(parse_date),
            parse_date,
        ),
        // char/varchar/decimal only match on equality, whatever the operator
        ColumnType::Text => select_rows(cells, CompareOp::Eq, Some(pred.right.as_str()), Some),
    };
    store.reindex(&index)
}

fn select_rows<'c, T: PartialOrd>(
    cells: &'c [String],
    op: CompareOp,
    right: Option<T>,
    parse: impl Fn(&'c str) -> Option<T>,
) -> Vec<usize> {
    let Some(right) = right else {
        return Vec::new();
    };
    cells
        .iter()
        .enumerate()
        .filter_map(|(i, cell)| {
            parse(cell.as_str())
                .filter(|left| op.holds(left, &right))
                .map(|_| i)
        })
        .collect()
}

fn parse_int(value: &str) -> Option<i64> {
    value.trim().parse().ok()
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Drops one leading and one trailing character, e.g. `'1995-03-15'`.
fn strip_quotes(value: &str) -> Option<&str> {
    let mut chars = value.chars();
    chars.next()?;
    chars.next_back()?;
    Some(chars.as_str())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::catalog::ColumnDef;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn schema() -> TableSchema {
        let col = |name: &str, ty| ColumnDef {
            name: name.to_string(),
            ty,
            size: 8,
        };
        TableSchema::new(vec![
            col("id", ColumnType::Int),
            col("day", ColumnType::Date),
            col("tag", ColumnType::Text),
        ])
    }

    fn store() -> ColumnStore {
        [
            ("id".to_string(), strings(&["1", "2", "3", "x", "5"])),
            (
                "day".to_string(),
                strings(&[
                    "1995-01-01",
                    "1995-06-01",
                    "1996-01-01",
                    "bad",
                    "1994-12-31",
                ]),
            ),
            ("tag".to_string(), strings(&["a", "b", "a", "c", "b"])),
        ]
        .into_iter()
        .collect()
    }

    fn pred(left: &str, op: CompareOp, right: &str, connector: Connector) -> Predicate {
        Predicate {
            left: left.to_string(),
            op,
            right: right.to_string(),
            connector,
        }
    }

    #[test]
    fn test_empty_chain_is_identity() {
        assert_eq!(filter(store(), &[], &schema()), store());
    }

    #[test]
    fn test_int_comparisons_skip_unparseable() {
        let out = filter(
            store(),
            &[pred("id", CompareOp::Ge, "2", Connector::None)],
            &schema(),
        );
        assert_eq!(out.get("id").unwrap(), strings(&["2", "3", "5"]));
        assert_eq!(out.get("tag").unwrap(), strings(&["b", "a", "b"]));
    }

    #[test]
    fn test_unparseable_literal_matches_nothing() {
        let out = filter(
            store(),
            &[pred("id", CompareOp::Eq, "one", Connector::None)],
            &schema(),
        );
        assert_eq!(out.row_count(), 0);
    }

    #[test]
    fn test_date_literal_is_quote_stripped() {
        let out = filter(
            store(),
            &[pred("day", CompareOp::Lt, "'1995-06-01'", Connector::None)],
            &schema(),
        );
        assert_eq!(out.get("id").unwrap(), strings(&["1", "5"]));

        let eq = filter(
            store(),
            &[pred("day", CompareOp::Eq, "'1996-01-01'", Connector::None)],
            &schema(),
        );
        assert_eq!(eq.get("id").unwrap(), strings(&["3"]));
    }

    #[test]
    fn test_text_equality() {
        let out = filter(
            store(),
            &[pred("tag", CompareOp::Eq, "a", Connector::None)],
            &schema(),
        );
        assert_eq!(out.get("id").unwrap(), strings(&["1", "3"]));
    }

    #[test]
    fn test_text_ignores_ordering_operator() {
        let out = filter(
            store(),
            &[pred("tag", CompareOp::Gt, "a", Connector::None)],
            &schema(),
        );
        assert_eq!(out.get("tag").unwrap(), strings(&["a", "a"]));
        assert_eq!(out.get("id").unwrap(), strings(&["1", "3"]));

        let le = filter(
            store(),
            &[pred("tag", CompareOp::Le, "b", Connector::None)],
            &schema(),
        );
        assert_eq!(le.get("id").unwrap(), strings(&["2", "5"]));
    }

    #[test]
    fn test_and_is_intersection() {
        let out = filter(
            store(),
            &[
                pred("tag", CompareOp::Eq, "b", Connector::And),
                pred("id", CompareOp::Gt, "2", Connector::None),
            ],
            &schema(),
        );
        assert_eq!(out.get("id").unwrap(), strings(&["5"]));
        assert_eq!(out.get("day").unwrap(), strings(&["1994-12-31"]));
    }

    #[test]
    fn test_or_is_columnwise_dedup_concat() {
        // id=1 -> rows {0}; tag=b -> rows {1, 4}
        let out = filter(
            store(),
            &[
                pred("id", CompareOp::Eq, "1", Connector::Or),
                pred("tag", CompareOp::Eq, "b", Connector::None),
            ],
            &schema(),
        );
        // fresh branch first, then the accumulated rows, duplicates removed per column
        assert_eq!(out.get("id").unwrap(), strings(&["2", "5", "1"]));
        assert_eq!(out.get("tag").unwrap(), strings(&["b", "a"]));
        assert_eq!(
            out.get("day").unwrap(),
            strings(&["1995-06-01", "1994-12-31", "1995-01-01"])
        );
    }

    #[test]
    fn test_and_then_or_chain() {
        // tag=b AND id>2 OR id=1
        let out = filter(
            store(),
            &[
                pred("tag", CompareOp::Eq, "b", Connector::And),
                pred("id", CompareOp::Gt, "2", Connector::Or),
                pred("id", CompareOp::Eq, "1", Connector::None),
            ],
            &schema(),
        );
        assert_eq!(out.get("id").unwrap(), strings(&["1", "5"]));
        assert_eq!(out.get("tag").unwrap(), strings(&["a", "b"]));
        assert_eq!(
            out.get("day").unwrap(),
            strings(&["1995-01-01", "1994-12-31"])
        );
    }

    #[test]
    fn test_or_then_and_chain() {
        // id=1 OR tag=b AND id<3: the AND runs over the column-wise union
        let out = filter(
            store(),
            &[
                pred("id", CompareOp::Eq, "1", Connector::Or),
                pred("tag", CompareOp::Eq, "b", Connector::And),
                pred("id", CompareOp::Lt, "3", Connector::None),
            ],
            &schema(),
        );
        assert_eq!(out.get("id").unwrap(), strings(&["2", "1"]));
        assert_eq!(out.get("tag").unwrap(), strings(&["b"]));
        assert_eq!(
            out.get("day").unwrap(),
            strings(&["1995-06-01", "1995-01-01"])
        );
    }

    #[test]
    fn test_missing_connector_stops_chain() {
        let out = filter(
            store(),
            &[
                pred("tag", CompareOp::Eq, "b", Connector::None),
                pred("id", CompareOp::Eq, "5", Connector::None),
            ],
            &schema(),
        );
        assert_eq!(out.get("id").unwrap(), strings(&["2", "5"]));
    }

    #[test]
    fn test_unknown_column_yields_empty() {
        let out = filter(
            store(),
            &[pred("nope", CompareOp::Eq, "1", Connector::None)],
            &schema(),
        );
        assert_eq!(out.row_count(), 0);
        assert!(out.get("id").is_some());
    }

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("'x'"), Some("x"));
        assert_eq!(strip_quotes("''"), Some(""));
        assert_eq!(strip_quotes("'"), None);
    }
}
