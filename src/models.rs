//! Persisted records.

use serde_json::Value;
use sqlx::types::Json;

pub const ITEM_TABLE: &str = "item";

/// Row of the `item` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Item {
    pub id: i64,
    pub data: Option<Json<Value>>,
}
