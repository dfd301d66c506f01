use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub product_id: i64,
    pub product_name: String,
    pub product_type: String,
    pub sellable: String,
    pub custom_fields: Json<Value>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Sale {
    pub sales_id: i64,
    pub product_id: i64,
    pub sales_amount: Decimal,
    pub quantity: i32,
    pub customer_name: Option<String>,
    pub sale_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Dashboard {
    pub dashboard_id: i64,
    pub user_id: Uuid,
    pub product_id: i64,
    /// Name of the linked product frozen at dashboard creation; later
    /// product renames do not propagate here.
    pub product_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
