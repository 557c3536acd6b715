//! OpenAPI document for the public routes.

use crate::handlers::{items, probe};
use crate::response::{Empty, ErrorBody};
use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(items::get_items_count, items::add_item, probe::ping, probe::ready),
    components(schemas(ErrorBody, Empty, items::CountBody)),
    tags(
        (name = "items", description = "Item counter"),
        (name = "probe", description = "Liveness and readiness"),
    )
)]
pub struct ApiDoc;

/// GET /openapi.json
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
