//! State-changing commands and their wire encoding.
//!
//! Each [`Command`] corresponds to one lifecycle [`Transition`] and to exactly
//! one request. Both the raw operations on [`OrderClient`](crate::OrderClient)
//! and the checked [`OrderClient::execute`](crate::OrderClient::execute) build
//! their requests here.

use orderdesk_core::{Next, OrderId, OrderStatus, PaymentStatus, Transition};
use serde::Serialize;
use serde_json::Value;

use crate::error::OrderError;
use crate::transport::{ApiRequest, Method};
use crate::types::{Order, RefundAck, RefundApproval, RefundRejection, RefundRequest};

/// A state-changing operation on one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `PUT /api/orders/{id}/status`
    SetStatus(OrderStatus),
    /// `PUT /api/orders/{id}/pay` with an explicit payment status.
    SetPaymentStatus(PaymentStatus),
    /// `PUT /api/orders/{id}/pay` without a body.
    MarkPaid,
    /// `PUT /api/orders/{id}/cancel`
    Cancel {
        /// Optional cancellation reason; omitted from the body when `None`.
        reason: Option<String>,
    },
    /// `POST /api/orders/{id}/request-refund`
    RequestRefund(RefundRequest),
    /// `PUT /api/orders/{id}/approve-refund`
    ApproveRefund(RefundApproval),
    /// `PUT /api/orders/{id}/reject-refund`
    RejectRefund(RefundRejection),
}

/// Result of a checked command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// The server returned the updated order.
    Updated(Order),
    /// The server acknowledged a refund operation.
    Acknowledged {
        /// Acknowledgment payload.
        ack: RefundAck,
        /// State the legality table predicts; `ServerDecides` means re-fetch.
        expected: Next,
    },
}

impl CommandOutcome {
    /// The updated order, if the server returned one.
    #[must_use]
    pub fn order(&self) -> Option<&Order> {
        match self {
            Self::Updated(order) => Some(order),
            Self::Acknowledged { ack, .. } => ack.order.as_ref(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusBody {
    status: OrderStatus,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentBody {
    payment_status: PaymentStatus,
}

#[derive(Serialize)]
struct CancelBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

impl Command {
    /// Lifecycle transition this command performs.
    #[must_use]
    pub const fn transition(&self) -> Transition {
        match self {
            Self::SetStatus(status) => Transition::SetStatus(*status),
            Self::SetPaymentStatus(status) => Transition::SetPaymentStatus(*status),
            Self::MarkPaid => Transition::MarkPaid,
            Self::Cancel { .. } => Transition::Cancel,
            Self::RequestRefund(_) => Transition::RequestRefund,
            Self::ApproveRefund(_) => Transition::ApproveRefund,
            Self::RejectRefund(_) => Transition::RejectRefund,
        }
    }

    /// Operation name used in logs and errors.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::SetStatus(_) => "update_status",
            Self::SetPaymentStatus(_) => "update_payment_status",
            Self::MarkPaid => "mark_paid",
            Self::Cancel { .. } => "cancel_order",
            Self::RequestRefund(_) => "request_refund",
            Self::ApproveRefund(_) => "approve_refund",
            Self::RejectRefund(_) => "reject_refund",
        }
    }

    /// Whether the server answers with the updated order (otherwise an acknowledgment).
    #[must_use]
    pub const fn returns_order(&self) -> bool {
        !matches!(
            self,
            Self::RequestRefund(_) | Self::ApproveRefund(_) | Self::RejectRefund(_)
        )
    }

    /// Build the request for `order_id`.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Encode`] if the body cannot be serialized.
    pub fn request(&self, order_id: &OrderId) -> Result<ApiRequest, OrderError> {
        let (method, action, body) = match self {
            Self::SetStatus(status) => (
                Method::PUT,
                "status",
                Some(encode(&StatusBody { status: *status })?),
            ),
            Self::SetPaymentStatus(payment_status) => (
                Method::PUT,
                "pay",
                Some(encode(&PaymentBody {
                    payment_status: *payment_status,
                })?),
            ),
            Self::MarkPaid => (Method::PUT, "pay", None),
            Self::Cancel { reason } => (
                Method::PUT,
                "cancel",
                Some(encode(&CancelBody {
                    reason: reason.as_deref(),
                })?),
            ),
            Self::RequestRefund(request) => {
                (Method::POST, "request-refund", Some(encode(request)?))
            }
            Self::ApproveRefund(approval) => {
                (Method::PUT, "approve-refund", Some(encode(&approval.body())?))
            }
            Self::RejectRefund(rejection) => {
                (Method::PUT, "reject-refund", Some(encode(rejection)?))
            }
        };

        let request = ApiRequest::new(method, ["api", "orders", order_id.as_str(), action]);
        Ok(match body {
            Some(body) => request.with_body(body),
            None => request,
        })
    }
}

fn encode<T: Serialize>(body: &T) -> Result<Value, OrderError> {
    serde_json::to_value(body).map_err(|e| OrderError::Encode(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use orderdesk_core::Money;
    use serde_json::json;

    use super::*;

    fn id() -> OrderId {
        OrderId::new("o-1")
    }

    #[test]
    fn test_status_request() {
        let request = Command::SetStatus(OrderStatus::Processing)
            .request(&id())
            .unwrap();
        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.path(), "/api/orders/o-1/status");
        assert_eq!(request.body, Some(json!({"status": "processing"})));
    }

    #[test]
    fn test_payment_requests_share_route() {
        let explicit = Command::SetPaymentStatus(PaymentStatus::Paid)
            .request(&id())
            .unwrap();
        let implicit = Command::MarkPaid.request(&id()).unwrap();
        assert_eq!(explicit.path(), "/api/orders/o-1/pay");
        assert_eq!(implicit.path(), "/api/orders/o-1/pay");
        assert_eq!(explicit.body, Some(json!({"paymentStatus": "paid"})));
        assert_eq!(implicit.body, None);
    }

    #[test]
    fn test_cancel_without_reason_omits_field() {
        let request = Command::Cancel { reason: None }.request(&id()).unwrap();
        assert_eq!(request.path(), "/api/orders/o-1/cancel");
        assert_eq!(request.body, Some(json!({})));

        let request = Command::Cancel {
            reason: Some("changed my mind".to_string()),
        }
        .request(&id())
        .unwrap();
        assert_eq!(request.body, Some(json!({"reason": "changed my mind"})));
    }

    #[test]
    fn test_refund_routes() {
        let request = Command::RequestRefund(RefundRequest::new("damaged"))
            .request(&id())
            .unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path(), "/api/orders/o-1/request-refund");

        let request = Command::ApproveRefund(RefundApproval::new("cash", Money::from_units(1)))
            .request(&id())
            .unwrap();
        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.path(), "/api/orders/o-1/approve-refund");
        assert_eq!(request.body.unwrap()["createImportVoucher"], json!(true));

        let request = Command::RejectRefund(RefundRejection::default())
            .request(&id())
            .unwrap();
        assert_eq!(request.path(), "/api/orders/o-1/reject-refund");
        assert_eq!(request.body, Some(json!({})));
    }

    #[test]
    fn test_returns_order() {
        assert!(Command::MarkPaid.returns_order());
        assert!(Command::Cancel { reason: None }.returns_order());
        assert!(!Command::RejectRefund(RefundRejection::default()).returns_order());
    }

    #[test]
    fn test_transition_mapping() {
        assert_eq!(
            Command::SetStatus(OrderStatus::Completed).transition(),
            Transition::SetStatus(OrderStatus::Completed)
        );
        assert_eq!(
            Command::ApproveRefund(RefundApproval::new("cash", Money::ZERO)).transition(),
            Transition::ApproveRefund
        );
    }
}
