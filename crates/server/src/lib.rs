//! HTTP surface for facial emotion detection.
//!
//! - `POST /detect-emotion`: classify the faces in an uploaded image
//! - `GET /video_feed`: annotated live camera stream
//! - `GET /`: landing page
//! - `GET /health`: liveness probe

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::{AppState, StateOptions};
