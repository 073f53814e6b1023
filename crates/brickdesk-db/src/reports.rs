//! Financial read models.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// One month of profit and loss.
///
/// `gross_profit` is revenue less cost of goods and platform fees; purchase
/// spend is reported alongside but not deducted, since it is already counted
/// through the cost of the items sold.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfitLossRow {
    pub month: NaiveDate,
    pub items_sold: i64,
    pub revenue: Decimal,
    pub cost_of_goods: Decimal,
    pub platform_fees: Decimal,
    pub purchase_spend: Decimal,
    pub gross_profit: Decimal,
}

/// Monthly P&L for `[from, to)`, oldest month first. Months with no sales,
/// fees, or purchases are omitted.
///
/// # Errors
///
/// Returns [`DbError::InvalidInput`] when `from` is not before `to`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn profit_and_loss(
    pool: &PgPool,
    user_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<ProfitLossRow>, DbError> {
    if from >= to {
        return Err(DbError::InvalidInput {
            field: "from",
            reason: format!("{from} is not before {to}"),
        });
    }

    let rows = sqlx::query_as::<_, ProfitLossRow>(
        "WITH sales AS ( \
             SELECT date_trunc('month', sold_at)::date AS month, \
                    COUNT(*) AS items_sold, \
                    SUM(COALESCE(sold_price, 0)) AS revenue, \
                    SUM(cost) AS cost_of_goods \
             FROM inventory_items \
             WHERE user_id = $1 AND status = 'SOLD' \
               AND sold_at >= $2::date AND sold_at < $3::date \
             GROUP BY 1 \
         ), fees AS ( \
             SELECT date_trunc('month', order_date)::date AS month, SUM(fees) AS platform_fees \
             FROM platform_orders \
             WHERE user_id = $1 AND status NOT IN ('cancelled', 'refunded') \
               AND order_date >= $2::date AND order_date < $3::date \
             GROUP BY 1 \
         ), spend AS ( \
             SELECT date_trunc('month', purchase_date)::date AS month, \
                    SUM(total_cost) AS purchase_spend \
             FROM purchases \
             WHERE user_id = $1 AND purchase_date >= $2 AND purchase_date < $3 \
             GROUP BY 1 \
         ), months AS ( \
             SELECT month FROM sales UNION SELECT month FROM fees UNION SELECT month FROM spend \
         ) \
         SELECT m.month, \
                COALESCE(s.items_sold, 0) AS items_sold, \
                COALESCE(s.revenue, 0) AS revenue, \
                COALESCE(s.cost_of_goods, 0) AS cost_of_goods, \
                COALESCE(f.platform_fees, 0) AS platform_fees, \
                COALESCE(p.purchase_spend, 0) AS purchase_spend, \
                COALESCE(s.revenue, 0) - COALESCE(s.cost_of_goods, 0) \
                    - COALESCE(f.platform_fees, 0) AS gross_profit \
         FROM months m \
         LEFT JOIN sales s ON s.month = m.month \
         LEFT JOIN fees f ON f.month = m.month \
         LEFT JOIN spend p ON p.month = m.month \
         ORDER BY m.month",
    )
    .bind(user_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
