use crate::error::{EtlError, Result};
use crate::recordset::{Column, ColumnType, RecordSet, Row, Schema, Value};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::debug;

/// Groups rows by the exact tuple of group-key values and sums the
/// measure column per group.
///
/// Null is a legal group-key value and groups with null. The reducer is
/// a plain sum: commutative and associative with identity zero, so the
/// result is independent of input row order (and would stay correct
/// under parallel grouping). Null measures are skipped; a group whose
/// measures are all null sums to zero. Output columns are the group
/// keys in the order given, then the measure; one row per distinct
/// tuple, in first-seen order.
pub fn aggregate(input: &RecordSet, group_keys: &[&str], measure: &str) -> Result<RecordSet> {
    let key_indices: Vec<usize> = group_keys
        .iter()
        .map(|k| input.schema().require(k))
        .collect::<Result<_>>()?;
    let measure_idx = input.schema().require(measure)?;

    let measure_col = &input.schema().columns()[measure_idx];
    if measure_col.ty != ColumnType::Number {
        return Err(EtlError::Schema(format!(
            "measure column '{}' is {:?}, expected Number",
            measure, measure_col.ty
        )));
    }

    let mut group_order: Vec<Vec<Value>> = Vec::new();
    let mut sums: HashMap<Vec<Value>, Decimal> = HashMap::new();

    for row in input.rows() {
        let key: Vec<Value> = key_indices.iter().map(|&i| row[i].clone()).collect();
        let sum = sums.entry(key.clone()).or_insert_with(|| {
            group_order.push(key.clone());
            Decimal::ZERO
        });
        if let Value::Number(amount) = &row[measure_idx] {
            *sum += amount;
        }
    }

    let mut columns: Vec<Column> = key_indices
        .iter()
        .map(|&i| input.schema().columns()[i].clone())
        .collect();
    columns.push(Column::number(measure));
    let schema = Schema::new(columns)?;

    let rows: Vec<Row> = group_order
        .into_iter()
        .map(|key| {
            let sum = sums[&key];
            let mut row = key;
            row.push(Value::Number(sum));
            row
        })
        .collect();

    debug!(
        input_rows = input.len(),
        groups = rows.len(),
        "aggregation complete"
    );
    RecordSet::new(schema, rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payments(rows: Vec<(&str, Option<i64>)>) -> RecordSet {
        let schema =
            Schema::new(vec![Column::text("product"), Column::number("amount")]).unwrap();
        let rows = rows
            .into_iter()
            .map(|(product, amount)| {
                vec![
                    Value::text(product),
                    match amount {
                        Some(n) => Value::Number(Decimal::new(n, 0)),
                        None => Value::Null,
                    },
                ]
            })
            .collect();
        RecordSet::new(schema, rows).unwrap()
    }

    #[test]
    fn sums_per_group() {
        let input = payments(vec![("A", Some(30)), ("A", Some(20)), ("B", Some(5))]);
        let result = aggregate(&input, &["product"], "amount").unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(
            result.rows()[0],
            vec![Value::text("A"), Value::Number(Decimal::new(50, 0))]
        );
        assert_eq!(
            result.rows()[1],
            vec![Value::text("B"), Value::Number(Decimal::new(5, 0))]
        );
    }

    #[test]
    fn negative_amounts_participate() {
        let input = payments(vec![("A", Some(50)), ("A", Some(-20))]);
        let result = aggregate(&input, &["product"], "amount").unwrap();
        assert_eq!(result.rows()[0][1], Value::Number(Decimal::new(30, 0)));
    }

    #[test]
    fn null_group_key_forms_its_own_group() {
        let schema =
            Schema::new(vec![Column::text("product"), Column::number("amount")]).unwrap();
        let input = RecordSet::new(
            schema,
            vec![
                vec![Value::Null, Value::Number(Decimal::new(1, 0))],
                vec![Value::Null, Value::Number(Decimal::new(2, 0))],
                vec![Value::text("A"), Value::Number(Decimal::new(4, 0))],
            ],
        )
        .unwrap();

        let result = aggregate(&input, &["product"], "amount").unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.rows()[0][0], Value::Null);
        assert_eq!(result.rows()[0][1], Value::Number(Decimal::new(3, 0)));
    }

    #[test]
    fn all_null_measures_sum_to_zero() {
        let input = payments(vec![("A", None), ("A", None)]);
        let result = aggregate(&input, &["product"], "amount").unwrap();
        assert_eq!(result.rows()[0][1], Value::Number(Decimal::ZERO));
    }

    #[test]
    fn row_order_does_not_change_sums() {
        let forward = payments(vec![("A", Some(1)), ("B", Some(10)), ("A", Some(2))]);
        let reversed = payments(vec![("A", Some(2)), ("B", Some(10)), ("A", Some(1))]);

        let a = aggregate(&forward, &["product"], "amount").unwrap();
        let b = aggregate(&reversed, &["product"], "amount").unwrap();

        let mut a_rows = a.rows().to_vec();
        let mut b_rows = b.rows().to_vec();
        a_rows.sort_by_key(|r| format!("{:?}", r));
        b_rows.sort_by_key(|r| format!("{:?}", r));
        assert_eq!(a_rows, b_rows);
    }

    #[test]
    fn missing_measure_is_schema_error() {
        let input = payments(vec![("A", Some(1))]);
        assert!(matches!(
            aggregate(&input, &["product"], "no_such_column"),
            Err(EtlError::Schema(_))
        ));
    }

    #[test]
    fn text_measure_is_schema_error() {
        let input = payments(vec![("A", Some(1))]);
        assert!(matches!(
            aggregate(&input, &["amount"], "product"),
            Err(EtlError::Schema(_))
        ));
    }
}
