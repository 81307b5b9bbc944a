//! Order lifecycle legality table.
//!
//! The order server is the authority on which transitions are allowed. This
//! module mirrors its contract as pure data so callers can reject an illegal
//! request locally before it reaches the network:
//!
//! ```text
//! pending ──status──▶ processing ──status──▶ completed
//! pending | processing ──cancel──▶ cancelled
//! pending | processing | completed ──request refund──▶ refund_requested
//! refund_requested ──approve refund──▶ refunded   (payment ──▶ refunded)
//! refund_requested ──reject refund──▶ decided by the server
//!
//! payment pending ──pay──▶ paid            (order not cancelled/refunded)
//! payment paid ──pay──▶ refunded           (order refund_requested/refunded)
//! ```
//!
//! # Example
//!
//! ```rust
//! use orderdesk_core::lifecycle::{Next, OrderState, Transition};
//! use orderdesk_core::OrderStatus;
//!
//! let state = OrderState::new();
//! let next = state.apply(Transition::SetStatus(OrderStatus::Processing)).unwrap();
//! assert_eq!(next.status(), Some(OrderStatus::Processing));
//!
//! assert!(state.apply(Transition::ApproveRefund).is_err());
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{OrderStatus, PaymentStatus};

/// The pair of statuses that determines which transitions are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderState {
    /// Order status.
    pub status: OrderStatus,
    /// Payment status.
    pub payment_status: PaymentStatus,
}

/// A state-changing operation on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Set the order status directly.
    SetStatus(OrderStatus),
    /// Set the payment status directly.
    SetPaymentStatus(PaymentStatus),
    /// Mark the order as paid.
    MarkPaid,
    /// Cancel the order.
    Cancel,
    /// Ask for a refund.
    RequestRefund,
    /// Approve a pending refund request.
    ApproveRefund,
    /// Reject a pending refund request.
    RejectRefund,
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SetStatus(status) => write!(f, "set status to {status}"),
            Self::SetPaymentStatus(status) => write!(f, "set payment status to {status}"),
            Self::MarkPaid => f.write_str("mark paid"),
            Self::Cancel => f.write_str("cancel"),
            Self::RequestRefund => f.write_str("request refund"),
            Self::ApproveRefund => f.write_str("approve refund"),
            Self::RejectRefund => f.write_str("reject refund"),
        }
    }
}

/// The state expected after a legal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// The resulting state is known in advance.
    Known(OrderState),
    /// Only the server knows the resulting state; re-fetch the order.
    ServerDecides,
}

impl Next {
    /// Expected order status, if known.
    #[must_use]
    pub const fn status(&self) -> Option<OrderStatus> {
        match self {
            Self::Known(state) => Some(state.status),
            Self::ServerDecides => None,
        }
    }

    /// Expected payment status, if known.
    #[must_use]
    pub const fn payment_status(&self) -> Option<PaymentStatus> {
        match self {
            Self::Known(state) => Some(state.payment_status),
            Self::ServerDecides => None,
        }
    }
}

/// A transition that the order's current state does not allow.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error(
    "cannot {transition}: order is {} (payment {})",
    .from.status,
    .from.payment_status
)]
pub struct IllegalTransition {
    /// State the order was in.
    pub from: OrderState,
    /// Transition that was attempted.
    pub transition: Transition,
}

impl OrderState {
    /// State of a freshly created order.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
        }
    }

    /// Build a state from its two statuses.
    #[must_use]
    pub const fn from_parts(status: OrderStatus, payment_status: PaymentStatus) -> Self {
        Self {
            status,
            payment_status,
        }
    }

    /// Check `transition` against the legality table.
    ///
    /// # Errors
    ///
    /// Returns [`IllegalTransition`] when the transition is not allowed from
    /// this state, including transitions that would not change anything.
    pub fn apply(self, transition: Transition) -> Result<Next, IllegalTransition> {
        use OrderStatus as S;
        use PaymentStatus as P;

        let illegal = IllegalTransition {
            from: self,
            transition,
        };

        let next = match transition {
            Transition::SetStatus(to) => match (self.status, to) {
                (S::Pending, S::Processing)
                | (S::Processing, S::Completed)
                | (S::Pending | S::Processing, S::Cancelled)
                | (S::Pending | S::Processing | S::Completed, S::RefundRequested) => {
                    self.with_status(to)
                }
                (S::RefundRequested, S::Refunded) => self.refunded(),
                _ => return Err(illegal),
            },
            Transition::Cancel => match self.status {
                S::Pending | S::Processing => self.with_status(S::Cancelled),
                _ => return Err(illegal),
            },
            Transition::RequestRefund => match self.status {
                S::Pending | S::Processing | S::Completed => self.with_status(S::RefundRequested),
                _ => return Err(illegal),
            },
            Transition::ApproveRefund => match self.status {
                S::RefundRequested => self.refunded(),
                _ => return Err(illegal),
            },
            Transition::RejectRefund => match self.status {
                S::RefundRequested => return Ok(Next::ServerDecides),
                _ => return Err(illegal),
            },
            Transition::MarkPaid | Transition::SetPaymentStatus(P::Paid) => {
                match (self.payment_status, self.status) {
                    (P::Pending, status) if !status.is_terminal() => {
                        self.with_payment(P::Paid)
                    }
                    _ => return Err(illegal),
                }
            }
            Transition::SetPaymentStatus(P::Refunded) => match (self.payment_status, self.status)
            {
                (P::Paid, S::RefundRequested | S::Refunded) => self.with_payment(P::Refunded),
                _ => return Err(illegal),
            },
            Transition::SetPaymentStatus(P::Pending) => return Err(illegal),
        };

        Ok(Next::Known(next))
    }

    /// Whether `transition` is legal from this state.
    #[must_use]
    pub fn allows(self, transition: Transition) -> bool {
        self.apply(transition).is_ok()
    }

    const fn with_status(self, status: OrderStatus) -> Self {
        Self { status, ..self }
    }

    const fn with_payment(self, payment_status: PaymentStatus) -> Self {
        Self {
            payment_status,
            ..self
        }
    }

    const fn refunded(self) -> Self {
        Self {
            status: OrderStatus::Refunded,
            payment_status: PaymentStatus::Refunded,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn state(status: OrderStatus, payment: PaymentStatus) -> OrderState {
        OrderState::from_parts(status, payment)
    }

    #[test]
    fn test_forward_path() {
        let placed = OrderState::new();
        let processing = placed
            .apply(Transition::SetStatus(OrderStatus::Processing))
            .unwrap();
        assert_eq!(processing.status(), Some(OrderStatus::Processing));

        let processing = state(OrderStatus::Processing, PaymentStatus::Paid);
        let completed = processing
            .apply(Transition::SetStatus(OrderStatus::Completed))
            .unwrap();
        assert_eq!(
            completed,
            Next::Known(state(OrderStatus::Completed, PaymentStatus::Paid))
        );
    }

    #[test]
    fn test_cannot_skip_processing() {
        let err = OrderState::new()
            .apply(Transition::SetStatus(OrderStatus::Completed))
            .unwrap_err();
        assert_eq!(err.from, OrderState::new());
        assert_eq!(
            err.to_string(),
            "cannot set status to completed: order is pending (payment pending)"
        );
    }

    #[test]
    fn test_same_status_is_rejected() {
        assert!(!OrderState::new().allows(Transition::SetStatus(OrderStatus::Pending)));
    }

    #[test]
    fn test_cancel_only_before_completion() {
        assert!(OrderState::new().allows(Transition::Cancel));
        assert!(state(OrderStatus::Processing, PaymentStatus::Paid).allows(Transition::Cancel));
        assert!(!state(OrderStatus::Completed, PaymentStatus::Paid).allows(Transition::Cancel));
        assert!(!state(OrderStatus::Cancelled, PaymentStatus::Pending).allows(Transition::Cancel));
    }

    #[test]
    fn test_refund_request_sources() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Completed,
        ] {
            let next = state(status, PaymentStatus::Paid)
                .apply(Transition::RequestRefund)
                .unwrap();
            assert_eq!(next.status(), Some(OrderStatus::RefundRequested));
            assert_eq!(next.payment_status(), Some(PaymentStatus::Paid));
        }

        for status in [
            OrderStatus::Cancelled,
            OrderStatus::RefundRequested,
            OrderStatus::Refunded,
        ] {
            assert!(!state(status, PaymentStatus::Paid).allows(Transition::RequestRefund));
        }
    }

    #[test]
    fn test_approve_refund_moves_both_statuses() {
        let next = state(OrderStatus::RefundRequested, PaymentStatus::Paid)
            .apply(Transition::ApproveRefund)
            .unwrap();
        assert_eq!(
            next,
            Next::Known(state(OrderStatus::Refunded, PaymentStatus::Refunded))
        );
    }

    #[test]
    fn test_refund_decisions_require_a_request() {
        let completed = state(OrderStatus::Completed, PaymentStatus::Paid);
        assert!(!completed.allows(Transition::ApproveRefund));
        assert!(!completed.allows(Transition::RejectRefund));
    }

    #[test]
    fn test_reject_refund_is_server_decided() {
        let next = state(OrderStatus::RefundRequested, PaymentStatus::Paid)
            .apply(Transition::RejectRefund)
            .unwrap();
        assert_eq!(next, Next::ServerDecides);
        assert_eq!(next.status(), None);
    }

    #[test]
    fn test_payment_transitions() {
        assert!(OrderState::new().allows(Transition::MarkPaid));
        assert!(OrderState::new().allows(Transition::SetPaymentStatus(PaymentStatus::Paid)));
        assert!(
            !state(OrderStatus::Cancelled, PaymentStatus::Pending).allows(Transition::MarkPaid)
        );
        assert!(!state(OrderStatus::Processing, PaymentStatus::Paid).allows(Transition::MarkPaid));

        // Refunding the payment requires an open refund request.
        assert!(
            !state(OrderStatus::Completed, PaymentStatus::Paid)
                .allows(Transition::SetPaymentStatus(PaymentStatus::Refunded))
        );
        assert!(
            state(OrderStatus::RefundRequested, PaymentStatus::Paid)
                .allows(Transition::SetPaymentStatus(PaymentStatus::Refunded))
        );
        assert!(
            !state(OrderStatus::Processing, PaymentStatus::Paid)
                .allows(Transition::SetPaymentStatus(PaymentStatus::Pending))
        );
    }

    #[test]
    fn test_terminal_states_allow_nothing() {
        let transitions = [
            Transition::Cancel,
            Transition::RequestRefund,
            Transition::ApproveRefund,
            Transition::RejectRefund,
            Transition::MarkPaid,
        ];
        for status in [OrderStatus::Cancelled, OrderStatus::Refunded] {
            let from = state(status, PaymentStatus::Refunded);
            for transition in transitions {
                assert!(!from.allows(transition), "{status} allowed {transition}");
            }
            for to in OrderStatus::ALL {
                assert!(!from.allows(Transition::SetStatus(to)));
            }
        }
    }
}
