use crate::error::Result;
use crate::recordset::RecordSet;
use tracing::{debug, instrument};

pub mod aggregate;
pub mod join;

pub use aggregate::aggregate;
pub use join::left_join;

/// The output grain: one row per distinct tuple of these columns.
/// Identifier columns only drive the joins and are pruned before
/// grouping.
pub const GROUP_KEYS: [&str; 8] = [
    "first_name",
    "last_name",
    "email",
    "country",
    "gender",
    "product",
    "date_of_birth",
    "payment_date",
];

const PRUNED_COLUMNS: [&str; 4] = ["customer_id", "order_id", "payment_id", "order_date"];

pub const MEASURE_COLUMN: &str = "amount";

/// Joins the three source RecordSets and collapses them to the
/// per-customer-event grain with a summed amount.
///
/// customers ⟕ orders on (customer_id), then ⟕ payments on
/// (customer_id, order_id); identifiers and order_date are dropped, and
/// the remainder is aggregated on the eight-column grain. Pure: no side
/// effects, deterministic up to output row order. SchemaErrors from the
/// join or aggregation propagate unchanged.
#[instrument(skip_all)]
pub fn transform(
    customers: &RecordSet,
    orders: &RecordSet,
    payments: &RecordSet,
) -> Result<RecordSet> {
    let with_orders = left_join(customers, orders, &["customer_id"])?;
    let with_payments = left_join(&with_orders, payments, &["customer_id", "order_id"])?;
    let pruned = with_payments.without_columns(&PRUNED_COLUMNS)?;
    let aggregated = aggregate(&pruned, &GROUP_KEYS, MEASURE_COLUMN)?;

    debug!(
        customers = customers.len(),
        orders = orders.len(),
        payments = payments.len(),
        output_rows = aggregated.len(),
        "transform complete"
    );
    Ok(aggregated)
}
