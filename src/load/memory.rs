use super::Destination;
use crate::error::Result;
use crate::recordset::RecordSet;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// In-memory destination for development and testing. Mirrors the real
/// adapter's contract: replace_table swaps the whole table in one step.
#[derive(Default)]
pub struct InMemoryDestination {
    tables: Arc<Mutex<HashMap<String, RecordSet>>>,
}

impl InMemoryDestination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads back a table, if a run has created it.
    pub fn table(&self, name: &str) -> Option<RecordSet> {
        let tables = self.tables.lock().unwrap();
        tables.get(name).cloned()
    }
}

#[async_trait]
impl Destination for InMemoryDestination {
    async fn replace_table(&self, table: &str, rows: &RecordSet) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        tables.insert(table.to_string(), rows.clone());
        debug!(table = %table, rows = rows.len(), "replaced in-memory table");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::destination_schema;
    use crate::recordset::Value;
    use rust_decimal::Decimal;

    fn mart_row(first: &str, amount: i64) -> Vec<Value> {
        vec![
            Value::text(first),
            Value::text("Doe"),
            Value::text("x@example.com"),
            Value::text("Rwanda"),
            Value::text("F"),
            Value::text("A"),
            Value::text("1990-01-01"),
            Value::text("2023-01-02"),
            Value::Number(Decimal::new(amount, 0)),
        ]
    }

    #[tokio::test]
    async fn replace_discards_prior_contents() {
        let destination = InMemoryDestination::new();

        let first = RecordSet::new(
            destination_schema(),
            vec![mart_row("Jane", 50), mart_row("Ann", 20)],
        )
        .unwrap();
        let second = RecordSet::new(destination_schema(), vec![mart_row("Jane", 75)]).unwrap();

        destination.replace_table("customers_data", &first).await.unwrap();
        destination.replace_table("customers_data", &second).await.unwrap();

        let table = destination.table("customers_data").unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table, second);
    }

    #[tokio::test]
    async fn tables_are_independent() {
        let destination = InMemoryDestination::new();
        let rows = RecordSet::new(destination_schema(), vec![mart_row("Jane", 50)]).unwrap();

        destination.replace_table("a", &rows).await.unwrap();
        assert!(destination.table("b").is_none());
    }
}
