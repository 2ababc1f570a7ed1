//! Business logic services.
//!
//! Services contain the payment flows separated from HTTP handlers.
//! They talk to the store and the gateway only through their traits.

pub mod gateway;
pub mod identity;
pub mod order_service;
pub mod signature;
pub mod verification_service;
pub mod webhook_service;
