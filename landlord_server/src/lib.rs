//! Websocket host for the landlord table engine.
//!
//! Library half of the server binary so that integration tests can build
//! the router directly.

pub mod api;
pub mod config;
pub mod logging;
