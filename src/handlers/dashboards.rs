use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::database::models::{Dashboard, Product, User};
use crate::error::ApiError;
use crate::middleware::Identity;
use crate::services::sales::dashboard_sales_summary;

#[derive(Debug, Deserialize)]
pub struct DashboardPayload {
    /// Referenced product id
    pub product: i64,
}

/// GET /dashboards - Caller's dashboards (guests: all, as with /forms)
pub async fn list(
    Extension(pool): Extension<PgPool>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<Dashboard>>, ApiError> {
    let dashboards = match identity.user_id() {
        Some(user_id) => {
            sqlx::query_as("SELECT * FROM dashboards WHERE user_id = $1 ORDER BY created_at DESC")
                .bind(user_id)
                .fetch_all(&pool)
                .await?
        }
        None => {
            sqlx::query_as("SELECT * FROM dashboards ORDER BY created_at DESC")
                .fetch_all(&pool)
                .await?
        }
    };

    Ok(Json(dashboards))
}

/// POST /dashboards - Pair a dashboard with a product.
///
/// The product name is copied into the dashboard row at this point and
/// never updated again; renaming the product later does not touch it.
pub async fn create(
    Extension(pool): Extension<PgPool>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<DashboardPayload>,
) -> Result<(StatusCode, Json<Dashboard>), ApiError> {
    let product = super::products::find_scoped(&pool, &identity, payload.product).await?;
    let owner = User::resolve_owner(&pool, &identity).await?;

    let dashboard = sqlx::query_as(
        "INSERT INTO dashboards (user_id, product_id, product_name)
         VALUES ($1, $2, $3)
         RETURNING *",
    )
    .bind(owner)
    .bind(product.product_id)
    .bind(&product.product_name)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(dashboard)))
}

/// GET /dashboards/:dashboard_id/data - Composed read view: the dashboard,
/// its linked product, and a condensed sales summary (10 most recent sales).
pub async fn data(
    Path(dashboard_id): Path<i64>,
    Extension(pool): Extension<PgPool>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Value>, ApiError> {
    let dashboard = find_scoped(&pool, &identity, dashboard_id).await?;

    let product: Product = sqlx::query_as("SELECT * FROM products WHERE product_id = $1")
        .bind(dashboard.product_id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;

    let sales_summary = dashboard_sales_summary(&pool, product.product_id).await?;

    Ok(Json(json!({
        "dashboard": dashboard,
        "product": product,
        "sales_summary": sales_summary,
    })))
}

async fn find_scoped(
    pool: &PgPool,
    identity: &Identity,
    dashboard_id: i64,
) -> Result<Dashboard, ApiError> {
    let dashboard = match identity.user_id() {
        Some(user_id) => {
            sqlx::query_as::<_, Dashboard>(
                "SELECT * FROM dashboards WHERE dashboard_id = $1 AND user_id = $2",
            )
            .bind(dashboard_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Dashboard>("SELECT * FROM dashboards WHERE dashboard_id = $1")
                .bind(dashboard_id)
                .fetch_optional(pool)
                .await?
        }
    };

    dashboard.ok_or_else(|| ApiError::not_found("Dashboard not found"))
}
