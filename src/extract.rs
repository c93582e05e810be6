use crate::error::{EtlError, Result};
use crate::recordset::{Column, ColumnType, RecordSet, Row, Schema, Value};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, warn};

/// A source that can be decoded into a RecordSet. The three extractions
/// of a run are independent and may run concurrently.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Source identifier used in logs and extract errors.
    fn source_name(&self) -> &str;

    async fn extract(&self) -> Result<RecordSet>;
}

pub fn customers_schema() -> Schema {
    Schema::new(vec![
        Column::text("customer_id"),
        Column::text("first_name"),
        Column::text("last_name"),
        Column::text("email"),
        Column::text("country"),
        Column::text("gender"),
        Column::text("date_of_birth"),
    ])
    .expect("customers schema is well-formed")
}

pub fn orders_schema() -> Schema {
    Schema::new(vec![
        Column::text("customer_id"),
        Column::text("order_id"),
        Column::text("product"),
        Column::text("order_date"),
    ])
    .expect("orders schema is well-formed")
}

pub fn payments_schema() -> Schema {
    Schema::new(vec![
        Column::text("customer_id"),
        Column::text("order_id"),
        Column::text("payment_id"),
        Column::number("amount"),
        Column::text("payment_date"),
    ])
    .expect("payments schema is well-formed")
}

/// Decodes a headered CSV file into a RecordSet with a fixed schema.
///
/// Header columns are matched by name, so file column order does not
/// matter; every schema column must be present. Empty cells decode to
/// Null. Anything malformed (unreadable file, missing column, wrong row
/// arity, unparseable number) is an ExtractError naming the source.
pub struct CsvExtractor {
    name: String,
    path: PathBuf,
    schema: Schema,
}

impl CsvExtractor {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, schema: Schema) -> Self {
        CsvExtractor {
            name: name.into(),
            path: path.into(),
            schema,
        }
    }

    pub fn customers(path: impl Into<PathBuf>) -> Self {
        CsvExtractor::new("customers", path, customers_schema())
    }

    pub fn orders(path: impl Into<PathBuf>) -> Self {
        CsvExtractor::new("orders", path, orders_schema())
    }

    pub fn payments(path: impl Into<PathBuf>) -> Self {
        CsvExtractor::new("payments", path, payments_schema())
    }

    fn decode(&self, contents: &str) -> Result<RecordSet> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(contents.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| EtlError::extract(&self.name, e))?
            .clone();

        // Map each schema column onto its position in the file header.
        let mut positions = Vec::with_capacity(self.schema.len());
        for col in self.schema.columns() {
            let pos = headers.iter().position(|h| h == col.name).ok_or_else(|| {
                EtlError::extract(
                    &self.name,
                    format!("header is missing column '{}'", col.name),
                )
            })?;
            positions.push(pos);
        }
        for header in headers.iter() {
            if self.schema.column_index(header).is_none() {
                warn!(source = %self.name, column = %header, "ignoring unexpected column");
            }
        }

        let mut rows: Vec<Row> = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|e| EtlError::extract(&self.name, e))?;
            let mut row = Vec::with_capacity(self.schema.len());
            for (col, &pos) in self.schema.columns().iter().zip(positions.iter()) {
                let raw = record.get(pos).ok_or_else(|| {
                    EtlError::extract(
                        &self.name,
                        format!("row {} is missing column '{}'", line + 1, col.name),
                    )
                })?;
                row.push(decode_cell(&self.name, &col.name, col.ty, raw, line + 1)?);
            }
            rows.push(row);
        }

        debug!(source = %self.name, rows = rows.len(), "decoded source file");
        RecordSet::new(self.schema.clone(), rows)
    }
}

fn decode_cell(
    source: &str,
    column: &str,
    ty: ColumnType,
    raw: &str,
    line: usize,
) -> Result<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }
    match ty {
        ColumnType::Text => Ok(Value::text(trimmed)),
        ColumnType::Number => Decimal::from_str(trimmed)
            .map(Value::Number)
            .map_err(|_| {
                EtlError::extract(
                    source,
                    format!("row {} column '{}': '{}' is not numeric", line, column, raw),
                )
            }),
    }
}

#[async_trait]
impl Extractor for CsvExtractor {
    fn source_name(&self) -> &str {
        &self.name
    }

    async fn extract(&self) -> Result<RecordSet> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            EtlError::extract(&self.name, format!("{}: {}", self.path.display(), e))
        })?;
        self.decode(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn decodes_typed_rows() {
        let file = write_csv(
            "customer_id,order_id,payment_id,amount,payment_date\n\
             1,10,100,50.25,2023-01-02\n",
        );
        let rs = CsvExtractor::payments(file.path()).extract().await.unwrap();
        assert_eq!(rs.len(), 1);
        assert_eq!(
            rs.rows()[0][3],
            Value::Number(Decimal::from_str("50.25").unwrap())
        );
    }

    #[tokio::test]
    async fn header_order_is_irrelevant() {
        let file = write_csv(
            "amount,payment_date,customer_id,order_id,payment_id\n\
             7,2023-01-02,1,10,100\n",
        );
        let rs = CsvExtractor::payments(file.path()).extract().await.unwrap();
        assert_eq!(rs.rows()[0][0], Value::text("1"));
        assert_eq!(rs.rows()[0][3], Value::Number(Decimal::new(7, 0)));
    }

    #[tokio::test]
    async fn empty_cells_become_null() {
        let file = write_csv(
            "customer_id,order_id,payment_id,amount,payment_date\n\
             1,10,100,,\n",
        );
        let rs = CsvExtractor::payments(file.path()).extract().await.unwrap();
        assert_eq!(rs.rows()[0][3], Value::Null);
        assert_eq!(rs.rows()[0][4], Value::Null);
    }

    #[tokio::test]
    async fn missing_header_column_is_extract_error() {
        let file = write_csv("customer_id,order_id\n1,10\n");
        let result = CsvExtractor::payments(file.path()).extract().await;
        assert!(matches!(result, Err(EtlError::Extract { .. })));
    }

    #[tokio::test]
    async fn malformed_number_is_extract_error() {
        let file = write_csv(
            "customer_id,order_id,payment_id,amount,payment_date\n\
             1,10,100,not-a-number,2023-01-02\n",
        );
        let result = CsvExtractor::payments(file.path()).extract().await;
        assert!(matches!(result, Err(EtlError::Extract { .. })));
    }

    #[tokio::test]
    async fn ragged_row_is_extract_error() {
        let file = write_csv(
            "customer_id,order_id,payment_id,amount,payment_date\n\
             1,10\n",
        );
        let result = CsvExtractor::payments(file.path()).extract().await;
        assert!(matches!(result, Err(EtlError::Extract { .. })));
    }

    #[tokio::test]
    async fn unreadable_file_is_extract_error() {
        let result = CsvExtractor::customers("/no/such/file.csv").extract().await;
        assert!(matches!(result, Err(EtlError::Extract { .. })));
    }
}
