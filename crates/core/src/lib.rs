//! Orderdesk Core - Shared order lifecycle types.
//!
//! This crate provides the types used across all Orderdesk components:
//! - `orderdesk-client` - Typed client for the remote order-management API
//! - `orderdesk-cli` - Command-line access to every order operation
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O and no HTTP
//! clients. This keeps the legality table testable without a server.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, money, and order/payment statuses
//! - [`lifecycle`] - The order state machine as a legality table

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod lifecycle;
pub mod types;

pub use lifecycle::{IllegalTransition, Next, OrderState, Transition};
pub use types::*;
