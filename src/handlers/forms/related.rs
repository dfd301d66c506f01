use axum::{
    extract::{Extension, Path, Query},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::database::models::FormSubmission;
use crate::error::ApiError;

use super::schema::find_by_slug;

#[derive(Debug, Deserialize)]
pub struct RelatedDataQuery {
    pub target_slug: Option<String>,
    pub display_field: Option<String>,
}

/// GET /forms/:slug/related_data - `{id, label}` options for relation
/// dropdowns, drawn from another form's submissions.
///
/// Deliberately skips ownership checks on the target form: a form may
/// reference submissions of a form it does not own.
pub async fn related_data(
    Path(_slug): Path<String>,
    Query(query): Query<RelatedDataQuery>,
    Extension(pool): Extension<PgPool>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let target_slug = query
        .target_slug
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("target_slug parameter is required"))?;

    let target_form = find_by_slug(&pool, &target_slug).await?;
    let display_field = query.display_field.unwrap_or_default();

    let submissions: Vec<FormSubmission> =
        sqlx::query_as("SELECT * FROM form_submissions WHERE form_schema_id = $1 ORDER BY id")
            .bind(target_form.id)
            .fetch_all(&pool)
            .await?;

    // Submissions without the display field are skipped silently
    let options = submissions
        .iter()
        .filter_map(|submission| {
            submission
                .data
                .get(&display_field)
                .map(|label| json!({ "id": submission.id, "label": label }))
        })
        .collect();

    Ok(Json(options))
}
