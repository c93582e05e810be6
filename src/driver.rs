use crate::config::Config;
use crate::error::{EtlError, Result};
use crate::extract::{CsvExtractor, Extractor};
use crate::load::{Destination, Loader};
use crate::recordset::RecordSet;
use crate::transform::transform;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Stage the run was in when it reached its terminal state. No stage is
/// re-entered and the driver never retries; retry policy belongs to the
/// external scheduler, keyed off the run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Extracting,
    Transforming,
    Loading,
    Done,
    Failed,
}

/// Terminal outcome handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Success,
    Failed { reason: String },
    /// The final commit failed, so the destination may or may not hold
    /// the new table. Needs inspection, not a blind retry.
    PartiallyApplied { reason: String },
}

/// Machine-readable summary of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub state: RunState,
    pub outcome: RunOutcome,
    pub rows_loaded: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Sequences one Extract → Transform → Load run over the three sources.
pub struct PipelineDriver {
    customers: Box<dyn Extractor>,
    orders: Box<dyn Extractor>,
    payments: Box<dyn Extractor>,
    loader: Loader,
}

impl PipelineDriver {
    pub fn new(
        customers: Box<dyn Extractor>,
        orders: Box<dyn Extractor>,
        payments: Box<dyn Extractor>,
        loader: Loader,
    ) -> Self {
        PipelineDriver {
            customers,
            orders,
            payments,
            loader,
        }
    }

    /// Wires the standard CSV extractors and loader from configuration.
    pub fn from_config(config: &Config, destination: Arc<dyn Destination>) -> Self {
        PipelineDriver::new(
            Box::new(CsvExtractor::customers(&config.sources.customers)),
            Box::new(CsvExtractor::orders(&config.sources.orders)),
            Box::new(CsvExtractor::payments(&config.sources.payments)),
            Loader::new(destination, config.destination.table.clone()),
        )
    }

    /// The three sources share no state, so they are decoded
    /// concurrently; the transform is the barrier that waits for all
    /// of them.
    async fn extract_all(&self) -> Result<(RecordSet, RecordSet, RecordSet)> {
        tokio::try_join!(
            self.customers.extract(),
            self.orders.extract(),
            self.payments.extract()
        )
    }

    /// Runs the pipeline once: Extracting → Transforming → Loading →
    /// Done, with Failed terminal from any stage. Every failure carries
    /// a machine-readable reason; nothing is swallowed or retried here.
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> RunReport {
        let started_at = Utc::now();

        info!("extracting sources");
        let (customers, orders, payments) = match self.extract_all().await {
            Ok(sets) => sets,
            Err(e) => return Self::fail(RunState::Extracting, e, started_at),
        };
        info!(
            customers = customers.len(),
            orders = orders.len(),
            payments = payments.len(),
            "extraction complete"
        );

        info!("transforming");
        let aggregated = match transform(&customers, &orders, &payments) {
            Ok(rows) => rows,
            Err(e) => return Self::fail(RunState::Transforming, e, started_at),
        };
        info!(rows = aggregated.len(), "transform complete");

        info!(table = %self.loader.table(), "loading");
        let rows_loaded = match self.loader.load(&aggregated).await {
            Ok(count) => count,
            Err(e) => return Self::fail(RunState::Loading, e, started_at),
        };

        info!(rows_loaded, "run complete");
        RunReport {
            state: RunState::Done,
            outcome: RunOutcome::Success,
            rows_loaded,
            started_at,
            finished_at: Utc::now(),
        }
    }

    fn fail(stage: RunState, e: EtlError, started_at: DateTime<Utc>) -> RunReport {
        error!(stage = ?stage, "run failed: {}", e);
        let outcome = match e {
            EtlError::PartialApply(_) => RunOutcome::PartiallyApplied {
                reason: e.to_string(),
            },
            _ => RunOutcome::Failed {
                reason: e.to_string(),
            },
        };
        RunReport {
            state: RunState::Failed,
            outcome,
            rows_loaded: 0,
            started_at,
            finished_at: Utc::now(),
        }
    }
}
