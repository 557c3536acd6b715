//! Item queries, run against the session of the current request scope.

use crate::db::Database;
use crate::error::AppError;
use crate::models::{Item, ITEM_TABLE};
use serde_json::{Map, Value};
use sqlx::types::Json;

pub async fn count_items(db: &Database) -> Result<i64, AppError> {
    let session = db.current_session()?;
    let mut conn = session.connection().await?;
    let sql = format!("SELECT COUNT(*) FROM {}", ITEM_TABLE);
    tracing::debug!(sql = %sql, scope = %session.id(), "query");
    let (count,): (i64,) = sqlx::query_as(&sql).fetch_one(&mut *conn).await?;
    Ok(count)
}

/// Inserts one item with empty data and commits the session.
pub async fn add_item(db: &Database) -> Result<Item, AppError> {
    let session = db.current_session()?;
    let sql = format!("INSERT INTO {} (data) VALUES (?) RETURNING id, data", ITEM_TABLE);
    tracing::debug!(sql = %sql, scope = %session.id(), "query");
    let item = {
        let mut conn = session.connection().await?;
        sqlx::query_as::<_, Item>(&sql)
            .bind(Json(Value::Object(Map::new())))
            .fetch_one(&mut *conn)
            .await?
    };
    session.commit().await?;
    Ok(item)
}
