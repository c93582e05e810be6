use crate::error::{EtlError, Result};
use crate::recordset::{Column, RecordSet, Schema};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryDestination;
pub use postgres::PostgresDestination;

/// Fixed schema of the persisted mart table.
pub fn destination_schema() -> Schema {
    Schema::new(vec![
        Column::text("first_name"),
        Column::text("last_name"),
        Column::text("email"),
        Column::text("country"),
        Column::text("gender"),
        Column::text("product"),
        Column::text("date_of_birth"),
        Column::text("payment_date"),
        Column::number("amount"),
    ])
    .expect("destination schema is well-formed")
}

/// Write port for the destination store. One capability: replace the
/// named table's contents with the given rows, atomically — after a
/// successful call the table holds exactly these rows; after a failed
/// call the previous contents must still be intact (a failure where the
/// outcome is unknowable surfaces as PartialApply).
#[async_trait]
pub trait Destination: Send + Sync {
    async fn replace_table(&self, table: &str, rows: &RecordSet) -> Result<()>;
}

/// Persists a transformed RecordSet into the destination table with
/// full-refresh semantics.
pub struct Loader {
    destination: Arc<dyn Destination>,
    table: String,
}

impl Loader {
    pub fn new(destination: Arc<dyn Destination>, table: impl Into<String>) -> Self {
        Loader {
            destination,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Replaces the destination table with `rows`. The rows must carry
    /// the fixed destination schema; anything else would be rejected by
    /// the store row by row, so it is refused here as a WriteError
    /// before any destination state is touched.
    #[instrument(skip(self, rows), fields(table = %self.table))]
    pub async fn load(&self, rows: &RecordSet) -> Result<usize> {
        let expected = destination_schema();
        if rows.schema() != &expected {
            return Err(EtlError::Write(format!(
                "rows do not match destination schema: got [{}], expected [{}]",
                rows.schema().names().collect::<Vec<_>>().join(", "),
                expected.names().collect::<Vec<_>>().join(", ")
            )));
        }

        self.destination.replace_table(&self.table, rows).await?;
        info!(rows = rows.len(), "destination table refreshed");
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recordset::{RecordSet, Schema, Value};

    #[tokio::test]
    async fn rejects_rows_with_wrong_schema() {
        let destination = Arc::new(InMemoryDestination::new());
        let loader = Loader::new(destination.clone(), "customers_data");

        let wrong = RecordSet::new(
            Schema::new(vec![Column::text("only_one_column")]).unwrap(),
            vec![vec![Value::text("x")]],
        )
        .unwrap();

        let result = loader.load(&wrong).await;
        assert!(matches!(result, Err(EtlError::Write(_))));
        assert!(destination.table("customers_data").is_none());
    }

    #[tokio::test]
    async fn loads_matching_rows() {
        let destination = Arc::new(InMemoryDestination::new());
        let loader = Loader::new(destination.clone(), "customers_data");

        let rows = RecordSet::new(
            destination_schema(),
            vec![vec![
                Value::text("Jane"),
                Value::text("Doe"),
                Value::text("jane@example.com"),
                Value::text("Rwanda"),
                Value::text("F"),
                Value::text("A"),
                Value::text("1990-01-01"),
                Value::text("2023-01-02"),
                Value::Number(rust_decimal::Decimal::new(50, 0)),
            ]],
        )
        .unwrap();

        let loaded = loader.load(&rows).await.unwrap();
        assert_eq!(loaded, 1);
        assert_eq!(destination.table("customers_data").unwrap(), rows);
    }
}
