//! Item handlers: count and insert.

use crate::error::AppError;
use crate::response::{Empty, ErrorBody};
use crate::service::items;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CountBody {
    pub count: i64,
}

/// GET /items/count
#[utoipa::path(
    get,
    path = "/items/count",
    tag = "items",
    responses(
        (status = 200, description = "Number of stored items", body = CountBody),
        (status = 500, description = "Internal server error", body = ErrorBody),
    )
)]
pub async fn get_items_count(State(state): State<AppState>) -> Result<Json<CountBody>, AppError> {
    let count = items::count_items(&state.db).await?;
    Ok(Json(CountBody { count }))
}

/// POST /items: inserts one item with empty data. The request body is ignored.
#[utoipa::path(
    post,
    path = "/items",
    tag = "items",
    responses(
        (status = 200, description = "Item stored", body = Empty),
        (status = 500, description = "Internal server error", body = ErrorBody),
    )
)]
pub async fn add_item(State(state): State<AppState>) -> Result<Json<Empty>, AppError> {
    let item = items::add_item(&state.db).await?;
    tracing::debug!(item_id = item.id, "item added");
    Ok(Json(Empty {}))
}
