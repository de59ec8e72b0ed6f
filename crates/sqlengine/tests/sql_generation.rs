//! Property tests for generated DML: every placeholder has exactly one parameter.

use proptest::prelude::*;
use sqlengine::{Engine, Filter, Mode, RowData, Select, Value, filter_eq, filter_lt, mk_dialect};
use std::collections::BTreeSet;

fn engine() -> Engine {
    Engine::sql_only(Mode::ReadWrite, mk_dialect("POSTGRES").unwrap())
}

fn row_strategy() -> impl Strategy<Value = RowData> {
    prop::collection::btree_set("[A-Z][A-Z0-9_]{0,6}", 1..8).prop_flat_map(|names| {
        let names: Vec<String> = names.into_iter().collect();
        let n = names.len();
        prop::collection::vec(
            prop_oneof![
                Just(Value::Null),
                any::<i32>().prop_map(Value::Integer),
                "[a-z?]{0,6}".prop_map(Value::String),
            ],
            n,
        )
        .prop_map(move |values| names.clone().into_iter().zip(values).collect())
    })
}

fn filter_strategy() -> impl Strategy<Value = Filter> {
    prop_oneof![
        Just(Filter::default()),
        any::<i32>().prop_map(|v| filter_eq("Q", v)),
        (any::<i32>(), "[a-z]{0,4}").prop_map(|(a, b)| filter_lt("Q", a) | filter_eq("R", b)),
    ]
}

fn placeholders(sql: &str) -> usize {
    sql.matches('?').count()
}

proptest! {
    #[test]
    fn insert_binds_every_kept_column(row in row_strategy(), skip in 0usize..8) {
        let e = engine();
        let excluded: Vec<&str> = row.iter().take(skip).map(|(n, _)| n.as_str()).collect();
        match e.insert_sql("T", &row, &excluded) {
            Ok(sql) => prop_assert_eq!(placeholders(&sql), row.len() - excluded.len()),
            Err(_) => prop_assert_eq!(excluded.len(), row.len()),
        }
    }

    #[test]
    fn update_params_follow_placeholders(
        row in row_strategy(),
        keys in 0usize..3,
        filter in filter_strategy(),
    ) {
        let e = engine();
        let key_fields: Vec<&str> = row.iter().take(keys).map(|(n, _)| n.as_str()).collect();
        let mut params = Vec::new();
        if let Ok(sql) = e.update_sql("T", &row, &key_fields, &[], &filter, &mut params) {
            prop_assert_eq!(placeholders(&sql), params.len());
            // SET values come first, in row order.
            let set_len = row.len() - key_fields.len();
            let set: Vec<Value> = row.iter().skip(key_fields.len()).map(|(_, v)| v.clone()).collect();
            prop_assert_eq!(&params[..set_len], &set[..]);
            // Key values come last, in key order.
            let key_values: Vec<Value> = row.iter().take(key_fields.len()).map(|(_, v)| v.clone()).collect();
            prop_assert_eq!(&params[params.len() - key_values.len()..], &key_values[..]);
        } else {
            let keyless = key_fields.is_empty() && filter.is_empty();
            let nothing_to_set = key_fields.len() == row.len();
            prop_assert!(keyless || nothing_to_set);
        }
    }

    #[test]
    fn select_params_follow_placeholders(filter in filter_strategy(), having in filter_strategy()) {
        let e = engine();
        let select = Select::new("A, COUNT(*)").from("T").filter(filter).group_by("A").having(having);
        let mut params = Vec::new();
        let sql = e.select_sql(&select, &mut params).unwrap();
        prop_assert_eq!(placeholders(&sql), params.len());
    }

    #[test]
    fn column_names_are_unique_in_statements(row in row_strategy()) {
        let e = engine();
        let sql = e.insert_sql("T", &row, &[]).unwrap();
        let start = sql.find('(').unwrap() + 1;
        let end = sql.find(')').unwrap();
        let cols: BTreeSet<&str> = sql[start..end].split(", ").collect();
        prop_assert_eq!(cols.len(), row.len());
    }
}
