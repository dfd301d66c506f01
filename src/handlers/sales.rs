use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;

use crate::database::models::Sale;
use crate::error::ApiError;
use crate::middleware::Identity;

#[derive(Debug, Deserialize)]
pub struct SalePayload {
    /// Referenced product id
    pub product: i64,
    pub sales_amount: Decimal,
    pub quantity: i32,
    pub customer_name: Option<String>,
    pub sale_date: Option<DateTime<Utc>>,
}

impl SalePayload {
    fn validate(&self) -> Result<(), ApiError> {
        let mut field_errors = HashMap::new();
        if self.sales_amount < Decimal::ZERO {
            field_errors.insert("sales_amount".to_string(), "must be non-negative".to_string());
        }
        if self.quantity < 0 {
            field_errors.insert("quantity".to_string(), "must be non-negative".to_string());
        }
        if field_errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_error("Invalid sale", Some(field_errors)))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ByProductQuery {
    pub product_id: Option<i64>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct ProductBreakdown {
    pub product_name: String,
    pub total: Decimal,
    pub count: i64,
}

/// GET /sales - Sales on the caller's products (guests: all sales)
pub async fn list(
    Extension(pool): Extension<PgPool>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<Sale>>, ApiError> {
    let sales = match identity.user_id() {
        Some(user_id) => {
            sqlx::query_as(
                "SELECT s.* FROM sales s
                 JOIN products p ON p.product_id = s.product_id
                 WHERE p.user_id = $1
                 ORDER BY s.sale_date DESC, s.sales_id DESC",
            )
            .bind(user_id)
            .fetch_all(&pool)
            .await?
        }
        None => {
            sqlx::query_as("SELECT * FROM sales ORDER BY sale_date DESC, sales_id DESC")
                .fetch_all(&pool)
                .await?
        }
    };

    Ok(Json(sales))
}

/// POST /sales - Record a sale against an existing product
pub async fn create(
    Extension(pool): Extension<PgPool>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<SalePayload>,
) -> Result<(StatusCode, Json<Sale>), ApiError> {
    payload.validate()?;

    // The product must exist; ownership scoping matches the read side
    let product = super::products::find_scoped(&pool, &identity, payload.product).await?;

    let sale = sqlx::query_as(
        "INSERT INTO sales (product_id, sales_amount, quantity, customer_name, sale_date)
         VALUES ($1, $2, $3, $4, COALESCE($5, now()))
         RETURNING *",
    )
    .bind(product.product_id)
    .bind(payload.sales_amount)
    .bind(payload.quantity)
    .bind(&payload.customer_name)
    .bind(payload.sale_date)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(sale)))
}

/// GET /sales/by_product?product_id= - Scoped sales for one product
pub async fn by_product(
    Query(query): Query<ByProductQuery>,
    Extension(pool): Extension<PgPool>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<Sale>>, ApiError> {
    let product_id = query
        .product_id
        .ok_or_else(|| ApiError::bad_request("product_id parameter is required"))?;

    let sales = match identity.user_id() {
        Some(user_id) => {
            sqlx::query_as(
                "SELECT s.* FROM sales s
                 JOIN products p ON p.product_id = s.product_id
                 WHERE s.product_id = $1 AND p.user_id = $2
                 ORDER BY s.sale_date DESC, s.sales_id DESC",
            )
            .bind(product_id)
            .bind(user_id)
            .fetch_all(&pool)
            .await?
        }
        None => {
            sqlx::query_as(
                "SELECT * FROM sales WHERE product_id = $1 ORDER BY sale_date DESC, sales_id DESC",
            )
            .bind(product_id)
            .fetch_all(&pool)
            .await?
        }
    };

    Ok(Json(sales))
}

#[derive(Debug, FromRow)]
struct OverallAggregates {
    total_revenue: Decimal,
    total_sales: i64,
    total_quantity: i64,
    average_sale: Decimal,
}

/// GET /sales/analytics - Revenue totals with a per-product breakdown.
/// The breakdown totals sum to total_revenue across all groups.
pub async fn analytics(
    Extension(pool): Extension<PgPool>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, ApiError> {
    let (overall, by_product) = match identity.user_id() {
        Some(user_id) => {
            let overall: OverallAggregates = sqlx::query_as(
                "SELECT COALESCE(SUM(s.sales_amount), 0) AS total_revenue,
                        COUNT(*) AS total_sales,
                        COALESCE(SUM(s.quantity), 0)::BIGINT AS total_quantity,
                        COALESCE(ROUND(AVG(s.sales_amount), 2), 0) AS average_sale
                 FROM sales s
                 JOIN products p ON p.product_id = s.product_id
                 WHERE p.user_id = $1",
            )
            .bind(user_id)
            .fetch_one(&pool)
            .await?;

            let by_product: Vec<ProductBreakdown> = sqlx::query_as(
                "SELECT p.product_name,
                        COALESCE(SUM(s.sales_amount), 0) AS total,
                        COUNT(s.sales_id) AS count
                 FROM sales s
                 JOIN products p ON p.product_id = s.product_id
                 WHERE p.user_id = $1
                 GROUP BY p.product_name
                 ORDER BY total DESC",
            )
            .bind(user_id)
            .fetch_all(&pool)
            .await?;

            (overall, by_product)
        }
        None => {
            let overall: OverallAggregates = sqlx::query_as(
                "SELECT COALESCE(SUM(s.sales_amount), 0) AS total_revenue,
                        COUNT(*) AS total_sales,
                        COALESCE(SUM(s.quantity), 0)::BIGINT AS total_quantity,
                        COALESCE(ROUND(AVG(s.sales_amount), 2), 0) AS average_sale
                 FROM sales s",
            )
            .fetch_one(&pool)
            .await?;

            let by_product: Vec<ProductBreakdown> = sqlx::query_as(
                "SELECT p.product_name,
                        COALESCE(SUM(s.sales_amount), 0) AS total,
                        COUNT(s.sales_id) AS count
                 FROM sales s
                 JOIN products p ON p.product_id = s.product_id
                 GROUP BY p.product_name
                 ORDER BY total DESC",
            )
            .fetch_all(&pool)
            .await?;

            (overall, by_product)
        }
    };

    Ok(Json(json!({
        "total_revenue": overall.total_revenue,
        "total_sales": overall.total_sales,
        "total_quantity": overall.total_quantity,
        "average_sale": overall.average_sale,
        "by_product": by_product,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_amount_is_a_validation_error() {
        let payload: SalePayload = serde_json::from_value(serde_json::json!({
            "product": 1,
            "sales_amount": "-5.00",
            "quantity": 2
        }))
        .unwrap();

        let err = payload.validate().unwrap_err();
        assert_eq!(err.status_code(), 400);
        let body = err.to_json();
        assert_eq!(body["field_errors"]["sales_amount"], "must be non-negative");
    }

    #[test]
    fn non_negative_payload_passes() {
        let payload: SalePayload = serde_json::from_value(serde_json::json!({
            "product": 1,
            "sales_amount": "19.99",
            "quantity": 0
        }))
        .unwrap();
        assert!(payload.validate().is_ok());
    }
}
