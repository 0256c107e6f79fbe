//! Browser front end and JSON API for the three emotion panels.
//!
//! ## Endpoints
//!
//! - `GET /` - single-page UI
//! - `GET /health` - per-panel availability
//! - `POST /api/text` - `{ "text": "..." }`
//! - `POST /api/face` - multipart field `image` (PNG or JPEG)
//! - `POST /api/voice` - multipart field `audio` (`.wav` or `.mp3`)
//!
//! A panel whose models failed to load answers 503; the other panels keep
//! working.

mod handlers;
mod page;
mod server;
mod types;

pub use handlers::audio_suffix;
pub use server::{router, serve, AppState};
pub use types::{FaceResponse, PredictionResponse};
