//! Axum HTTP API server for the MediaFX montage service.
//!
//! This crate is the transport boundary: it normalizes request shapes into
//! the canonical plan type, maps pipeline outcomes onto HTTP statuses, and
//! streams result artifacts. All orchestration lives in `mediafx-pipeline`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
