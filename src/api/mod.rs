//! HTTP API - Routes, handlers and response bodies

pub mod handlers;
pub mod routes;
pub mod types;
