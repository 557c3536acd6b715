//! Router assembly: routes, fallbacks and the middleware stack.

use crate::error::{method_not_allowed, panic_response, route_not_found};
use crate::handlers::{items, probe};
use crate::middleware::{access_span, session_scope};
use crate::openapi::openapi_json;
use crate::settings::Settings;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use tracing::Level;

/// Maximum request body size (1 MiB).
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

pub fn item_routes() -> Router<AppState> {
    Router::new()
        .route("/items/count", get(items::get_items_count))
        .route("/items", post(items::add_item))
}

pub fn probe_routes() -> Router<AppState> {
    Router::new()
        .route("/pings", get(probe::ping))
        .route("/ready", get(probe::ready))
}

/// All public routes. The OpenAPI document is mounted outside production.
pub fn api_routes(settings: &Settings) -> Router<AppState> {
    let router = Router::new().merge(probe_routes()).merge(item_routes());
    if settings.environment.docs_enabled() {
        router.route("/openapi.json", get(openapi_json))
    } else {
        router
    }
}

/// The full application.
pub fn app(state: AppState) -> Router {
    let routes = api_routes(&state.settings);
    with_middleware(routes, state)
}

/// Wraps `routes` with the error fallbacks and the middleware stack, innermost first:
/// session scope, body limit, panic catcher, CORS, request id and access log.
pub fn with_middleware(routes: Router<AppState>, state: AppState) -> Router {
    routes
        .fallback(route_not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(axum::middleware::from_fn_with_state(state.clone(), session_scope))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(access_span)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(LatencyUnit::Millis),
                        )
                        .on_failure(()),
                )
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(CatchPanicLayer::custom(panic_response)),
        )
        .with_state(state)
}
