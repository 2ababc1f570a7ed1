//! Payment and order lifecycle for the Career Risk Calculator's paid report.
//!
//! Three paths touch a report's payment state:
//!
//! - **Order creation**: a logged-in user asks for a checkout order
//! - **Client verification**: the browser reports a signed checkout result
//! - **Webhook reconciliation**: the gateway pushes the captured payment
//!
//! Report status only moves forward, so the two confirmation paths can run
//! in either order, repeatedly, or concurrently and still agree.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
