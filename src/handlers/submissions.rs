use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Extension},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::database::models::FormSubmission;
use crate::error::ApiError;
use crate::middleware::Identity;

#[derive(Debug, Deserialize)]
pub struct CreateSubmission {
    pub slug: Option<String>,
    #[serde(default)]
    pub data: serde_json::Map<String, Value>,
}

/// GET /submissions - Submissions against schemas the caller owns.
/// Guests get an empty list; unlike /forms there is no dev-mode relaxation
/// here, submission data is only visible to form owners.
pub async fn list(
    Extension(pool): Extension<PgPool>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<FormSubmission>>, ApiError> {
    let Some(user_id) = identity.user_id() else {
        return Ok(Json(vec![]));
    };

    let submissions = sqlx::query_as(
        "SELECT s.* FROM form_submissions s
         JOIN form_schemas f ON f.id = s.form_schema_id
         WHERE f.created_by = $1
         ORDER BY s.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(submissions))
}

/// POST /submissions - Public endpoint recording one end-user response.
/// Captures the submitter when authenticated and the client IP either way.
pub async fn create(
    Extension(pool): Extension<PgPool>,
    Extension(identity): Extension<Identity>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<CreateSubmission>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let slug = payload
        .slug
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("Form slug is required"))?;

    let form = super::forms::schema::find_by_slug(&pool, &slug).await?;
    let ip_address = client_ip(&headers, addr);

    let (submission_id,): (i64,) = sqlx::query_as(
        "INSERT INTO form_submissions (form_schema_id, data, submitted_by, ip_address)
         VALUES ($1, $2, $3, $4)
         RETURNING id",
    )
    .bind(form.id)
    .bind(Value::Object(payload.data))
    .bind(identity.user_id())
    .bind(&ip_address)
    .fetch_one(&pool)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Form submitted successfully",
            "submission_id": submission_id
        })),
    ))
}

/// Client address: first X-Forwarded-For entry when present (the client
/// ahead of any proxies), otherwise the peer address.
fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| addr.ip().to_string())
}
