//! item-service: HTTP service with one database session per request and a
//! uniform JSON error envelope.

pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod response;
pub mod routes;
pub mod service;
pub mod settings;
pub mod state;
pub mod store;
pub mod telemetry;

pub use db::{Database, ScopeGuard, ScopeToken, Session, SessionError};
pub use error::{ApiError, AppError, ErrorKind};
pub use response::{Empty, ErrorBody};
pub use routes::{app, with_middleware};
pub use settings::{Environment, Settings};
pub use state::AppState;
pub use store::ensure_tables;
