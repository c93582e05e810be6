use crate::error::{EtlError, Result};
use crate::recordset::{RecordSet, Row, Schema, Value};
use std::collections::HashMap;
use tracing::debug;

/// Left outer join of two RecordSets on the named key columns.
///
/// Every left row appears in the output: once per matching right row, or
/// once with nulls for the right-side attributes when nothing matches.
/// Output columns are the left schema followed by the right schema minus
/// the join keys. Keys absent from either side, or declared with
/// different types on the two sides, fail with a SchemaError before any
/// row is touched.
pub fn left_join(left: &RecordSet, right: &RecordSet, keys: &[&str]) -> Result<RecordSet> {
    let left_keys: Vec<usize> = keys
        .iter()
        .map(|k| left.schema().require(k))
        .collect::<Result<_>>()?;
    let right_keys: Vec<usize> = keys
        .iter()
        .map(|k| right.schema().require(k))
        .collect::<Result<_>>()?;

    for (&li, &ri) in left_keys.iter().zip(right_keys.iter()) {
        let lcol = &left.schema().columns()[li];
        let rcol = &right.schema().columns()[ri];
        if lcol.ty != rcol.ty {
            return Err(EtlError::Schema(format!(
                "join key '{}' is {:?} on the left but {:?} on the right",
                lcol.name, lcol.ty, rcol.ty
            )));
        }
    }

    // Right-side columns carried into the output (everything but the keys).
    let carried: Vec<usize> = (0..right.schema().len())
        .filter(|i| !right_keys.contains(i))
        .collect();

    let mut columns = left.schema().columns().to_vec();
    columns.extend(carried.iter().map(|&i| right.schema().columns()[i].clone()));
    let schema = Schema::new(columns)?;

    // Hash index over the right side keyed by the join-key tuple.
    let mut index: HashMap<Vec<Value>, Vec<usize>> = HashMap::new();
    for (row_idx, row) in right.rows().iter().enumerate() {
        let key: Vec<Value> = right_keys.iter().map(|&i| row[i].clone()).collect();
        index.entry(key).or_default().push(row_idx);
    }

    let mut out: Vec<Row> = Vec::with_capacity(left.len());
    for lrow in left.rows() {
        let key: Vec<Value> = left_keys.iter().map(|&i| lrow[i].clone()).collect();
        match index.get(&key) {
            Some(matches) => {
                for &ridx in matches {
                    let rrow = &right.rows()[ridx];
                    let mut row = lrow.clone();
                    row.extend(carried.iter().map(|&i| rrow[i].clone()));
                    out.push(row);
                }
            }
            None => {
                let mut row = lrow.clone();
                row.extend(carried.iter().map(|_| Value::Null));
                out.push(row);
            }
        }
    }

    debug!(
        left_rows = left.len(),
        right_rows = right.len(),
        joined_rows = out.len(),
        "left join complete"
    );
    RecordSet::new(schema, out)
}
