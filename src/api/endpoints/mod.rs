//! Endpoint handlers. Each one is mounted at the root and under `/api`.

pub mod analyze;
pub mod download;
pub mod health;
