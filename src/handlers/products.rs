use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::Value;
use sqlx::types::Json as SqlJson;
use sqlx::PgPool;
use std::collections::HashMap;

use crate::database::models::{Product, User};
use crate::error::ApiError;
use crate::middleware::Identity;
use crate::services::sales::{product_sales_summary, ProductSalesSummary};

#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    /// Optional product_type filter
    #[serde(rename = "type")]
    pub product_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductPayload {
    pub product_name: String,
    #[serde(default)]
    pub product_type: String,
    #[serde(default = "default_sellable")]
    pub sellable: String,
    #[serde(default)]
    pub custom_fields: serde_json::Map<String, Value>,
}

fn default_sellable() -> String {
    "yes".to_string()
}

impl ProductPayload {
    fn validate(&self) -> Result<(), ApiError> {
        if self.sellable != "yes" && self.sellable != "no" {
            let mut field_errors = HashMap::new();
            field_errors.insert("sellable".to_string(), "must be 'yes' or 'no'".to_string());
            return Err(ApiError::validation_error("Invalid product", Some(field_errors)));
        }
        Ok(())
    }
}

/// GET /products?type= - Caller's products, optionally narrowed by type.
/// Guests see all products (same relaxation as /forms).
pub async fn list(
    Query(query): Query<ProductListQuery>,
    Extension(pool): Extension<PgPool>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let product_type = query.product_type.filter(|t| !t.is_empty());

    let products = match (identity.user_id(), product_type) {
        (Some(user_id), Some(ptype)) => {
            sqlx::query_as(
                "SELECT * FROM products WHERE user_id = $1 AND product_type = $2 ORDER BY created_at DESC",
            )
            .bind(user_id)
            .bind(ptype)
            .fetch_all(&pool)
            .await?
        }
        (Some(user_id), None) => {
            sqlx::query_as("SELECT * FROM products WHERE user_id = $1 ORDER BY created_at DESC")
                .bind(user_id)
                .fetch_all(&pool)
                .await?
        }
        (None, Some(ptype)) => {
            sqlx::query_as("SELECT * FROM products WHERE product_type = $1 ORDER BY created_at DESC")
                .bind(ptype)
                .fetch_all(&pool)
                .await?
        }
        (None, None) => {
            sqlx::query_as("SELECT * FROM products ORDER BY created_at DESC")
                .fetch_all(&pool)
                .await?
        }
    };

    Ok(Json(products))
}

/// POST /products - Create a product; guest writes land on the anonymous account
pub async fn create(
    Extension(pool): Extension<PgPool>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<ProductPayload>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    payload.validate()?;
    let owner = User::resolve_owner(&pool, &identity).await?;

    let product = sqlx::query_as(
        "INSERT INTO products (product_name, product_type, sellable, custom_fields, user_id)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(&payload.product_name)
    .bind(&payload.product_type)
    .bind(&payload.sellable)
    .bind(SqlJson(&payload.custom_fields))
    .bind(owner)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /products/:product_id
pub async fn get(
    Path(product_id): Path<i64>,
    Extension(pool): Extension<PgPool>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Product>, ApiError> {
    let product = find_scoped(&pool, &identity, product_id).await?;
    Ok(Json(product))
}

/// PUT /products/:product_id - Full update of the editable fields
pub async fn update(
    Path(product_id): Path<i64>,
    Extension(pool): Extension<PgPool>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<ProductPayload>,
) -> Result<Json<Product>, ApiError> {
    payload.validate()?;
    let existing = find_scoped(&pool, &identity, product_id).await?;

    let product = sqlx::query_as(
        "UPDATE products
         SET product_name = $1, product_type = $2, sellable = $3, custom_fields = $4, updated_at = now()
         WHERE product_id = $5
         RETURNING *",
    )
    .bind(&payload.product_name)
    .bind(&payload.product_type)
    .bind(&payload.sellable)
    .bind(SqlJson(&payload.custom_fields))
    .bind(existing.product_id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(product))
}

/// DELETE /products/:product_id
pub async fn delete(
    Path(product_id): Path<i64>,
    Extension(pool): Extension<PgPool>,
    Extension(identity): Extension<Identity>,
) -> Result<StatusCode, ApiError> {
    let existing = find_scoped(&pool, &identity, product_id).await?;

    sqlx::query("DELETE FROM products WHERE product_id = $1")
        .bind(existing.product_id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /products/:product_id/sales_summary - Totals plus the 5 most recent
/// sales; a product with no sales reports zeros, not nulls.
pub async fn sales_summary(
    Path(product_id): Path<i64>,
    Extension(pool): Extension<PgPool>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ProductSalesSummary>, ApiError> {
    let product = find_scoped(&pool, &identity, product_id).await?;
    let summary = product_sales_summary(&pool, product.product_id).await?;
    Ok(Json(summary))
}

/// Product by id within the caller's scope; guests scope to all products.
pub async fn find_scoped(
    pool: &PgPool,
    identity: &Identity,
    product_id: i64,
) -> Result<Product, ApiError> {
    let product = match identity.user_id() {
        Some(user_id) => {
            sqlx::query_as::<_, Product>(
                "SELECT * FROM products WHERE product_id = $1 AND user_id = $2",
            )
            .bind(product_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Product>("SELECT * FROM products WHERE product_id = $1")
                .bind(product_id)
                .fetch_optional(pool)
                .await?
        }
    };

    product.ok_or_else(|| ApiError::not_found("Product not found"))
}
