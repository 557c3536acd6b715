//! Table DDL, applied at startup. There is no migration history; tables are
//! created if absent.

use crate::models::ITEM_TABLE;
use sqlx::SqlitePool;

pub async fn ensure_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let ddl = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            id INTEGER PRIMARY KEY,
            data TEXT
        )
        "#,
        ITEM_TABLE
    );
    sqlx::query(&ddl).execute(pool).await?;
    tracing::debug!(table = ITEM_TABLE, "table ensured");
    Ok(())
}
