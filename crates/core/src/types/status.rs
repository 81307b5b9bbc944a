//! Status enums for orders.
//!
//! An order carries two independent statuses: the fulfillment-oriented
//! [`OrderStatus`] and the [`PaymentStatus`]. They are correlated (a payment
//! can only be refunded once a refund was requested) but neither is derived
//! from the other.

use serde::{Deserialize, Serialize};

/// Error returned when a status string is not recognised.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind} status: {value}")]
pub struct StatusParseError {
    kind: &'static str,
    value: String,
}

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed, not yet picked up by staff.
    #[default]
    Pending,
    /// Being prepared or shipped.
    Processing,
    /// Delivered to the customer.
    Completed,
    /// Cancelled before completion.
    Cancelled,
    /// The customer asked for a refund; awaiting an admin decision.
    RefundRequested,
    /// Refund approved and paid out.
    Refunded,
}

impl OrderStatus {
    /// Every order status, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Processing,
        Self::Completed,
        Self::Cancelled,
        Self::RefundRequested,
        Self::Refunded,
    ];

    /// Wire representation (e.g. `refund_requested`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::RefundRequested => "refund_requested",
            Self::Refunded => "refunded",
        }
    }

    /// Whether no further transition is expected from this status.
    ///
    /// `completed` is not terminal because a refund may still be requested.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| StatusParseError {
                kind: "order",
                value: s.to_owned(),
            })
    }
}

/// Payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Not paid yet.
    #[default]
    Pending,
    /// Payment received.
    Paid,
    /// Payment returned to the customer.
    Refunded,
}

impl PaymentStatus {
    /// Every payment status.
    pub const ALL: [Self; 3] = [Self::Pending, Self::Paid, Self::Refunded];

    /// Wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| StatusParseError {
                kind: "payment",
                value: s.to_owned(),
            })
    }
}
