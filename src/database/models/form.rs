use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// One field definition inside a schema's structure. The builder frontend
/// attaches labels, options and relation metadata; everything beyond the
/// field id is carried through opaquely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormField {
    pub id: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FormSchema {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub structure: Json<Vec<FormField>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FormSchema {
    /// Field ids declared by this schema, in structure order. Used as the
    /// allow-list for per-field submission filters.
    pub fn field_ids(&self) -> Vec<&str> {
        self.structure.iter().map(|f| f.id.as_str()).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FormSubmission {
    pub id: i64,
    pub form_schema_id: i64,
    pub data: Json<Value>,
    pub submitted_by: Option<Uuid>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Derive a URL-safe slug from a schema title: lowercase, alphanumerics
/// kept, runs of anything else collapsed to single hyphens.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}
