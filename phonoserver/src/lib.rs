//! # Phono HTTP surface
//!
//! Thin axum layer over [`phonoplayer::PlaybackController`]: seven GET
//! routes mirroring the historical AudioService contract, plus OpenAPI
//! documentation and a Swagger UI mount for the binary.

pub mod api;
pub mod logs;
pub mod openapi;

pub use openapi::ApiDoc;
