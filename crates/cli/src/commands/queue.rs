//! Print the ranked operator queue for a batch of orders.
//!
//! # Usage
//!
//! ```bash
//! bm-cli queue --file orders.json
//! bm-cli queue --file orders.json --now 2025-03-14T09:00:00Z --json
//! ```

use std::fmt::Write;
use std::path::Path;

use chrono::{DateTime, Utc};

use buildmart_admin::{Classification, OrderQueue};
use buildmart_core::Order;

use super::{CliError, read_json};

/// Load orders from `path` and print them ranked as of `now`.
///
/// # Errors
///
/// Returns `CliError` if the file cannot be read or parsed.
pub fn run(path: &Path, now: Option<DateTime<Utc>>, json: bool) -> Result<(), CliError> {
    let orders: Vec<Order> = read_json(path)?;
    let now = now.unwrap_or_else(Utc::now);
    tracing::info!(orders = orders.len(), %now, "Ranking order queue");

    let queue = OrderQueue::build(orders, now);
    if json {
        let text = serde_json::to_string_pretty(&queue).map_err(|source| CliError::Json {
            path: path.display().to_string(),
            source,
        })?;
        println!("{text}");
    } else {
        print!("{}", render(&queue));
    }
    Ok(())
}

/// Plain-text table, most urgent first.
#[must_use]
pub fn render(queue: &OrderQueue) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>8}  {:<14}  {:>5}  {:<12}  {:<8}  {:<20}",
        "ORDER", "CLASS", "SCORE", "STATUS", "PAYMENT", "CREATED"
    );
    for entry in &queue.entries {
        let order = &entry.order;
        let _ = writeln!(
            out,
            "{:>8}  {:<14}  {:>5.1}  {:<12}  {:<8}  {:<20}",
            order.id,
            entry.classification.to_string(),
            entry.score,
            order.order_status.to_string(),
            order.payment_status.to_string(),
            order.created_at.format("%Y-%m-%d %H:%M"),
        );
    }
    let _ = writeln!(
        out,
        "\n{} orders: {} urgent, {} high priority, {} normal",
        queue.len(),
        queue.count(Classification::Urgent),
        queue.count(Classification::HighPriority),
        queue.count(Classification::Normal),
    );
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;

    use buildmart_core::{
        CurrencyCode, FulfillmentMode, OrderId, OrderStatus, PaymentStatus, PaymentTerms, Price,
        Priority, ProductId,
    };

    use super::*;

    fn order(id: i64, status: OrderStatus, payment: PaymentStatus, created_at: DateTime<Utc>) -> Order {
        Order {
            id: OrderId::new(id),
            product_id: ProductId::new(3),
            quantity: 40,
            unit_price_at_submission: Price::new(Decimal::new(26500, 2), CurrencyCode::PHP),
            shipping_fee: Price::zero(CurrencyCode::PHP),
            free_shipping: true,
            payment_terms: PaymentTerms::Net30,
            priority: Priority::High,
            shipment_type: FulfillmentMode::Delivery,
            order_status: status,
            payment_status: payment,
            created_at,
            shipping_address: "Warehouse 2, Lapu-Lapu".to_string(),
            client_reference: None,
        }
    }

    #[test]
    fn test_render_lists_most_urgent_first() {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap();
        let queue = OrderQueue::build(
            vec![
                order(11, OrderStatus::Completed, PaymentStatus::Paid, now - Duration::hours(4)),
                order(12, OrderStatus::Pending, PaymentStatus::Pending, now - Duration::days(2)),
            ],
            now,
        );

        let text = render(&queue);
        let first = text.lines().nth(1).unwrap();
        assert!(first.contains("12"));
        assert!(first.contains("urgent"));
        assert!(text.contains("2 orders: 1 urgent, 0 high priority, 1 normal"));
    }
}
