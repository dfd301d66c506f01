use axum::{
    extract::{Extension, Path, Query},
    response::Json,
};
use sqlx::PgPool;

use crate::database::bind_json_value;
use crate::database::models::FormSubmission;
use crate::error::ApiError;
use crate::filter::SubmissionFilter;
use crate::middleware::Identity;

use super::schema::find_scoped_by_slug;

/// GET /forms/:slug/submissions - Submissions for one of the caller's
/// schemas, narrowed by `search` and `filter_<fieldId>` query parameters.
/// Every condition ANDs with the previous one.
pub async fn list_for_form(
    Path(slug): Path<String>,
    // Pairs rather than a map so a repeated filter key keeps every value
    Query(params): Query<Vec<(String, String)>>,
    Extension(pool): Extension<PgPool>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<FormSubmission>>, ApiError> {
    let form = find_scoped_by_slug(&pool, &identity, &slug).await?;

    // Filter fields must exist in the schema's structure; anything else is
    // a client error rather than an empty result.
    let field_ids = form.field_ids();
    let filter = SubmissionFilter::from_query(&params, &field_ids)?;
    let conditions = filter.to_sql(1);

    let mut sql = String::from("SELECT * FROM form_submissions WHERE form_schema_id = $1");
    for clause in &conditions.clauses {
        sql.push_str(" AND ");
        sql.push_str(clause);
    }
    sql.push_str(" ORDER BY created_at DESC");

    let mut query = sqlx::query_as::<_, FormSubmission>(&sql).bind(form.id);
    for param in conditions.params.iter() {
        query = bind_json_value(query, param);
    }

    let submissions = query.fetch_all(&pool).await?;
    Ok(Json(submissions))
}
