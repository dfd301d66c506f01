use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::database::models::Sale;

/// Aggregates for one product's sales. Sums, counts and averages over zero
/// rows come back as zeros, never null.
#[derive(Debug, Serialize)]
pub struct ProductSalesSummary {
    pub total_sales: Decimal,
    pub total_quantity: i64,
    pub sales_count: i64,
    pub average_sale: Decimal,
    pub recent_sales: Vec<Sale>,
}

/// Condensed variant embedded in the dashboard data view.
#[derive(Debug, Serialize)]
pub struct DashboardSalesSummary {
    pub total_sales: Decimal,
    pub sales_count: i64,
    pub recent_sales: Vec<Sale>,
}

#[derive(Debug, FromRow)]
struct SalesAggregates {
    total_amount: Decimal,
    total_quantity: i64,
    sales_count: i64,
    average_amount: Decimal,
}

async fn aggregates(pool: &PgPool, product_id: i64) -> Result<SalesAggregates, sqlx::Error> {
    sqlx::query_as(
        "SELECT COALESCE(SUM(sales_amount), 0) AS total_amount,
                COALESCE(SUM(quantity), 0)::BIGINT AS total_quantity,
                COUNT(*) AS sales_count,
                COALESCE(ROUND(AVG(sales_amount), 2), 0) AS average_amount
         FROM sales
         WHERE product_id = $1",
    )
    .bind(product_id)
    .fetch_one(pool)
    .await
}

async fn recent_sales(pool: &PgPool, product_id: i64, limit: i64) -> Result<Vec<Sale>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM sales WHERE product_id = $1 ORDER BY sale_date DESC, sales_id DESC LIMIT $2",
    )
    .bind(product_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Full summary for the product endpoint: totals plus the 5 most recent sales.
pub async fn product_sales_summary(
    pool: &PgPool,
    product_id: i64,
) -> Result<ProductSalesSummary, sqlx::Error> {
    let agg = aggregates(pool, product_id).await?;
    let recent = recent_sales(pool, product_id, 5).await?;

    Ok(ProductSalesSummary {
        total_sales: agg.total_amount,
        total_quantity: agg.total_quantity,
        sales_count: agg.sales_count,
        average_sale: agg.average_amount,
        recent_sales: recent,
    })
}

/// Summary for the dashboard data view: totals plus the 10 most recent sales.
pub async fn dashboard_sales_summary(
    pool: &PgPool,
    product_id: i64,
) -> Result<DashboardSalesSummary, sqlx::Error> {
    let agg = aggregates(pool, product_id).await?;
    let recent = recent_sales(pool, product_id, 10).await?;

    Ok(DashboardSalesSummary {
        total_sales: agg.total_amount,
        sales_count: agg.sales_count,
        recent_sales: recent,
    })
}
