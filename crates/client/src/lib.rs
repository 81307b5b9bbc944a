//! Orderdesk Client - Typed access to the order-management API.
//!
//! The client covers the order and refund lifecycle: listing and fetching
//! orders, placing new ones, and moving them through their status and payment
//! transitions.
//!
//! # Layers
//!
//! - **Raw operations** on [`OrderClient`] send exactly one request each and
//!   trust the server to enforce the lifecycle.
//! - **Checked commands** via [`OrderClient::execute`] consult the lifecycle
//!   table in [`orderdesk_core`] first and fail locally, without a request,
//!   when a transition is illegal.
//!
//! # Example
//!
//! ```rust,ignore
//! use orderdesk_client::{Command, OrderClient};
//! use orderdesk_core::{OrderId, OrderStatus};
//!
//! let client = OrderClient::from_env()?;
//! let order = client.get_order(&OrderId::new("665f1c2a9d3e4b0012ab34cd")).await?;
//! client.execute(&order, Command::SetStatus(OrderStatus::Processing)).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod transport;
pub mod types;

pub use client::OrderClient;
pub use command::{Command, CommandOutcome};
pub use config::{ClientConfig, ConfigError};
pub use error::OrderError;
#[cfg(any(test, feature = "mock"))]
pub use transport::MockTransport;
pub use transport::{ApiRequest, HttpTransport, Transport};
pub use types::*;
