//! HTTP surface for the analysis pipeline.
//!
//! `POST /analyze` runs a full analysis synchronously; `GET /download/risk`
//! and `GET /download/md` serve its artifacts; `GET /health` is a liveness
//! check. Every route is also mounted under `/api/`.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::serve;
pub use types::ApiContext;
