//! HTTP surface of the operational endpoint server.
//!
//! Provides the fixed health-check and metrics-exposition handlers.

pub mod handlers;
