use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use sqlx::types::Json as SqlJson;
use sqlx::PgPool;

use crate::database::models::{slugify, FormField, FormSchema, User};
use crate::error::ApiError;
use crate::middleware::Identity;

#[derive(Debug, Deserialize)]
pub struct FormSchemaPayload {
    pub title: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub structure: Vec<FormField>,
}

/// GET /forms - List the caller's schemas.
///
/// Guests see every schema. Dev-mode relaxation; security-relevant and
/// deliberately kept (see DESIGN.md) rather than silently tightened.
pub async fn list(
    Extension(pool): Extension<PgPool>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<FormSchema>>, ApiError> {
    let schemas = match identity.user_id() {
        Some(user_id) => {
            sqlx::query_as("SELECT * FROM form_schemas WHERE created_by = $1 ORDER BY created_at DESC")
                .bind(user_id)
                .fetch_all(&pool)
                .await?
        }
        None => {
            sqlx::query_as("SELECT * FROM form_schemas ORDER BY created_at DESC")
                .fetch_all(&pool)
                .await?
        }
    };

    Ok(Json(schemas))
}

/// POST /forms - Create a schema; guest writes land on the anonymous account
pub async fn create(
    Extension(pool): Extension<PgPool>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<FormSchemaPayload>,
) -> Result<(StatusCode, Json<FormSchema>), ApiError> {
    let slug = match payload.slug.filter(|s| !s.is_empty()) {
        Some(slug) => slug,
        None => slugify(&payload.title),
    };
    if slug.is_empty() {
        return Err(ApiError::bad_request("A slug or a sluggable title is required"));
    }

    let owner = User::resolve_owner(&pool, &identity).await?;

    let schema = sqlx::query_as(
        "INSERT INTO form_schemas (slug, title, description, structure, created_by)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(&slug)
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(SqlJson(&payload.structure))
    .bind(owner)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(schema)))
}

/// GET /forms/:slug - Retrieve one of the caller's schemas
pub async fn get(
    Path(slug): Path<String>,
    Extension(pool): Extension<PgPool>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<FormSchema>, ApiError> {
    let schema = find_scoped_by_slug(&pool, &identity, &slug).await?;
    Ok(Json(schema))
}

/// PUT /forms/:slug - Full update of title, description and structure.
/// The slug itself is immutable; it is the schema's public address.
pub async fn update(
    Path(slug): Path<String>,
    Extension(pool): Extension<PgPool>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<FormSchemaPayload>,
) -> Result<Json<FormSchema>, ApiError> {
    // Scope check first so a foreign slug 404s instead of being updated
    let existing = find_scoped_by_slug(&pool, &identity, &slug).await?;

    let schema = sqlx::query_as(
        "UPDATE form_schemas
         SET title = $1, description = $2, structure = $3, updated_at = now()
         WHERE id = $4
         RETURNING *",
    )
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(SqlJson(&payload.structure))
    .bind(existing.id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(schema))
}

/// DELETE /forms/:slug - Delete one of the caller's schemas
pub async fn delete(
    Path(slug): Path<String>,
    Extension(pool): Extension<PgPool>,
    Extension(identity): Extension<Identity>,
) -> Result<StatusCode, ApiError> {
    let existing = find_scoped_by_slug(&pool, &identity, &slug).await?;

    sqlx::query("DELETE FROM form_schemas WHERE id = $1")
        .bind(existing.id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /forms/:slug/public - Schema by slug with no ownership check.
/// Used by the renderer to display a form to end users.
pub async fn public(
    Path(slug): Path<String>,
    Extension(pool): Extension<PgPool>,
) -> Result<Json<FormSchema>, ApiError> {
    let schema = find_by_slug(&pool, &slug).await?;
    Ok(Json(schema))
}

/// Schema by slug regardless of owner; 404 when absent.
pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<FormSchema, ApiError> {
    sqlx::query_as::<_, FormSchema>("SELECT * FROM form_schemas WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Form not found"))
}

/// Schema by slug within the caller's scope. Guests scope to all schemas,
/// matching the list relaxation above.
pub async fn find_scoped_by_slug(
    pool: &PgPool,
    identity: &Identity,
    slug: &str,
) -> Result<FormSchema, ApiError> {
    let schema = match identity.user_id() {
        Some(user_id) => {
            sqlx::query_as::<_, FormSchema>(
                "SELECT * FROM form_schemas WHERE slug = $1 AND created_by = $2",
            )
            .bind(slug)
            .bind(user_id)
            .fetch_optional(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, FormSchema>("SELECT * FROM form_schemas WHERE slug = $1")
                .bind(slug)
                .fetch_optional(pool)
                .await?
        }
    };

    schema.ok_or_else(|| ApiError::not_found("Form not found"))
}
