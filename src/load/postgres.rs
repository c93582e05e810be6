use super::Destination;
use crate::config::DestinationConfig;
use crate::error::{EtlError, Result};
use crate::recordset::{ColumnType, RecordSet, Value};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info};

/// Postgres adapter for the Destination port.
///
/// The full refresh is a staged swap inside one transaction: rows go
/// into a staging table, then the previous table is dropped and the
/// staging table renamed into place. Postgres DDL is transactional, so
/// either the complete new table becomes visible at commit or the old
/// table survives a rollback; readers never see a partial table.
pub struct PostgresDestination {
    pool: PgPool,
}

impl PostgresDestination {
    pub async fn connect(config: &DestinationConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(&config.connect_url())
            .await
            .map_err(|e| EtlError::Connection(e.to_string()))?;
        info!(host = %config.host, database = %config.database, "connected to destination");
        Ok(PostgresDestination { pool })
    }
}

fn sql_type(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::Text => "text",
        ColumnType::Number => "numeric",
    }
}

fn statement_error(e: sqlx::Error) -> EtlError {
    match e {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            EtlError::Connection(e.to_string())
        }
        _ => EtlError::Write(e.to_string()),
    }
}

#[async_trait]
impl Destination for PostgresDestination {
    async fn replace_table(&self, table: &str, rows: &RecordSet) -> Result<()> {
        let staging = format!("{table}__staging");
        let schema = rows.schema();

        let column_defs = schema
            .columns()
            .iter()
            .map(|c| format!("{} {}", c.name, sql_type(c.ty)))
            .collect::<Vec<_>>()
            .join(", ");
        let column_names = schema.names().collect::<Vec<_>>().join(", ");
        let placeholders = (1..=schema.len())
            .map(|i| format!("${i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let insert_sql =
            format!("insert into {staging} ({column_names}) values ({placeholders})");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| EtlError::Connection(e.to_string()))?;

        sqlx::query(&format!("drop table if exists {staging}"))
            .execute(&mut *tx)
            .await
            .map_err(statement_error)?;
        sqlx::query(&format!("create table {staging} ({column_defs})"))
            .execute(&mut *tx)
            .await
            .map_err(statement_error)?;

        for row in rows.rows() {
            let mut query = sqlx::query(&insert_sql);
            for (col, value) in schema.columns().iter().zip(row.iter()) {
                query = match (col.ty, value) {
                    (ColumnType::Text, Value::Text(s)) => query.bind(Some(s.as_str())),
                    (ColumnType::Text, Value::Null) => query.bind(None::<&str>),
                    (ColumnType::Number, Value::Number(d)) => query.bind(Some(*d)),
                    (ColumnType::Number, Value::Null) => query.bind(None::<Decimal>),
                    (ty, value) => {
                        return Err(EtlError::Write(format!(
                            "column '{}' expects {:?}, row holds {:?}",
                            col.name, ty, value
                        )))
                    }
                };
            }
            query.execute(&mut *tx).await.map_err(statement_error)?;
            debug!(table = %staging, "inserted row");
        }

        sqlx::query(&format!("drop table if exists {table}"))
            .execute(&mut *tx)
            .await
            .map_err(statement_error)?;
        sqlx::query(&format!("alter table {staging} rename to {table}"))
            .execute(&mut *tx)
            .await
            .map_err(statement_error)?;

        // Once commit is in flight the outcome is no longer knowable
        // from here; the driver reports this as PartiallyApplied rather
        // than a plain failure.
        tx.commit()
            .await
            .map_err(|e| EtlError::PartialApply(e.to_string()))?;

        info!(table = %table, rows = rows.len(), "staged swap committed");
        Ok(())
    }
}
