//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, raw bytes, URL params)
//! 2. Delegates to a service or the store
//! 3. Returns HTTP response (JSON or plain text, status code)

pub mod health;
/// Checkout order creation
pub mod orders;
/// Verification, history and receipts
pub mod payments;
/// Gateway webhook receiver
pub mod webhooks;
