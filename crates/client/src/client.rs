//! Order lifecycle client.
//!
//! One method per remote operation. Every method issues exactly one request,
//! never retries, logs a failure once, and returns it unchanged.

use orderdesk_core::{Next, OrderId, OrderStatus, PaymentStatus};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use crate::command::{Command, CommandOutcome};
use crate::config::ClientConfig;
use crate::error::OrderError;
use crate::transport::{ApiRequest, HttpTransport, Method, Transport};
use crate::types::{Order, OrderDraft, RefundAck, RefundApproval, RefundRejection, RefundRequest};

/// Envelope keys the server may wrap a single order in.
const ORDER_ENVELOPE_KEYS: &[&str] = &["data", "order"];

/// Envelope keys the server may wrap an order list in.
const LIST_ENVELOPE_KEYS: &[&str] = &["data", "orders"];

/// Typed client for the order-management API.
///
/// Generic over the [`Transport`] so tests can substitute an in-memory one.
#[derive(Debug, Clone)]
pub struct OrderClient<T = HttpTransport> {
    transport: T,
}

impl OrderClient<HttpTransport> {
    /// Create a client backed by [`HttpTransport`].
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP transport fails to build.
    pub fn from_config(config: &ClientConfig) -> Result<Self, OrderError> {
        Ok(Self::new(HttpTransport::new(config)?))
    }

    /// Create a client from `ORDER_API_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Config`] if configuration is missing or invalid.
    pub fn from_env() -> Result<Self, OrderError> {
        let config = ClientConfig::from_env().map_err(|e| OrderError::Config(e.to_string()))?;
        Self::from_config(&config)
    }
}

impl<T: Transport> OrderClient<T> {
    /// Create a client over an existing transport.
    #[must_use]
    pub const fn new(transport: T) -> Self {
        Self { transport }
    }

    /// The underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// List all orders (admin view).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be parsed.
    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<Order>, OrderError> {
        self.fetch_list("list_orders", ApiRequest::new(Method::GET, ["api", "orders"]))
            .await
    }

    /// List the orders of the authenticated caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be parsed.
    #[instrument(skip(self))]
    pub async fn list_my_orders(&self) -> Result<Vec<Order>, OrderError> {
        self.fetch_list(
            "list_my_orders",
            ApiRequest::new(Method::GET, ["api", "orders", "user"]),
        )
        .await
    }

    /// Get one order.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotFound`] for unknown ids, or any transport error.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn get_order(&self, id: &OrderId) -> Result<Order, OrderError> {
        const OPERATION: &str = "get_order";
        let request = ApiRequest::new(Method::GET, ["api", "orders", id.as_str()]);
        let body = self.send(OPERATION, request).await?;
        let order: Order = decode_required(OPERATION, body, ORDER_ENVELOPE_KEYS)?;
        warn_inconsistent(&order);
        Ok(order)
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Place a new order. The server assigns id, number and totals.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails. The request is never retried.
    #[instrument(skip(self, draft), fields(items = draft.items.len()))]
    pub async fn create_order(&self, draft: &OrderDraft) -> Result<Order, OrderError> {
        const OPERATION: &str = "create_order";
        let body = serde_json::to_value(draft).map_err(|e| {
            error!(operation = OPERATION, error = %e, "Failed to encode order draft");
            OrderError::Encode(e.to_string())
        })?;
        let request = ApiRequest::new(Method::POST, ["api", "orders"]).with_body(body);

        let body = self.send(OPERATION, request).await?;
        let order: Order = decode_required(OPERATION, body, ORDER_ENVELOPE_KEYS)?;
        warn_inconsistent(&order);

        debug!(
            order_id = %order.id,
            order_number = %order.order_number,
            status = %order.status,
            "Order created"
        );
        Ok(order)
    }

    // =========================================================================
    // Transitions (unchecked)
    // =========================================================================

    /// Set the order status. No local legality check is made.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be parsed.
    #[instrument(skip(self), fields(order_id = %id, status = %status))]
    pub async fn update_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<Order, OrderError> {
        self.run_for_order(id, &Command::SetStatus(status), None)
            .await
    }

    /// Set the payment status.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::EmptyResponse`] if the server answers with a
    /// success status but no body, or any transport error.
    #[instrument(skip(self), fields(order_id = %id, payment_status = %payment_status))]
    pub async fn update_payment_status(
        &self,
        id: &OrderId,
        payment_status: PaymentStatus,
    ) -> Result<Order, OrderError> {
        self.run_for_order(id, &Command::SetPaymentStatus(payment_status), None)
            .await
    }

    /// Mark the order as paid without naming a payment status.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be parsed.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn mark_paid(&self, id: &OrderId) -> Result<Order, OrderError> {
        self.run_for_order(id, &Command::MarkPaid, None).await
    }

    /// Cancel the order. A `None` reason is omitted from the request body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be parsed.
    #[instrument(skip(self, reason), fields(order_id = %id))]
    pub async fn cancel_order(
        &self,
        id: &OrderId,
        reason: Option<&str>,
    ) -> Result<Order, OrderError> {
        let command = Command::Cancel {
            reason: reason.map(str::to_owned),
        };
        self.run_for_order(id, &command, None).await
    }

    /// Ask for a refund.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be parsed.
    #[instrument(skip(self, request), fields(order_id = %id))]
    pub async fn request_refund(
        &self,
        id: &OrderId,
        request: &RefundRequest,
    ) -> Result<RefundAck, OrderError> {
        self.run_for_ack(id, &Command::RequestRefund(request.clone()), None)
            .await
    }

    /// Approve a pending refund. The import voucher flag defaults to `true`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be parsed.
    #[instrument(
        skip(self, approval),
        fields(order_id = %id, amount = %approval.refund_amount, method = %approval.refund_method)
    )]
    pub async fn approve_refund(
        &self,
        id: &OrderId,
        approval: &RefundApproval,
    ) -> Result<RefundAck, OrderError> {
        self.run_for_ack(id, &Command::ApproveRefund(approval.clone()), None)
            .await
    }

    /// Reject a pending refund. The resulting order status is decided by the
    /// server; re-fetch the order to learn it.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be parsed.
    #[instrument(skip(self, rejection), fields(order_id = %id))]
    pub async fn reject_refund(
        &self,
        id: &OrderId,
        rejection: &RefundRejection,
    ) -> Result<RefundAck, OrderError> {
        self.run_for_ack(id, &Command::RejectRefund(rejection.clone()), None)
            .await
    }

    // =========================================================================
    // Transitions (checked)
    // =========================================================================

    /// Run `command` against a known order after checking the lifecycle table.
    ///
    /// Illegal transitions fail with [`OrderError::IllegalTransition`] before
    /// anything is sent. Legal ones issue exactly one request; if the order
    /// carries a `version`, it is sent as `If-Match` so the server can reject
    /// stale writes with [`OrderError::Conflict`].
    ///
    /// # Errors
    ///
    /// Returns the local legality error or any error of the underlying operation.
    #[instrument(
        skip(self, order, command),
        fields(order_id = %order.id, operation = command.operation())
    )]
    pub async fn execute(
        &self,
        order: &Order,
        command: Command,
    ) -> Result<CommandOutcome, OrderError> {
        let expected = order.state().apply(command.transition()).map_err(|e| {
            warn!(error = %e, "Rejected illegal transition locally");
            OrderError::from(e)
        })?;
        let if_match = order.version.map(|v| v.to_string());

        if !command.returns_order() {
            let ack = self.run_for_ack(&order.id, &command, if_match).await?;
            return Ok(CommandOutcome::Acknowledged { ack, expected });
        }

        let updated = self.run_for_order(&order.id, &command, if_match).await?;
        let diverged = match expected {
            Next::Known(state) => (state != updated.state()).then_some(state),
            Next::ServerDecides => None,
        };
        if let Some(state) = diverged {
            warn!(
                expected_status = %state.status,
                expected_payment_status = %state.payment_status,
                status = %updated.status,
                payment_status = %updated.payment_status,
                "Server result differs from the lifecycle table"
            );
        }
        Ok(CommandOutcome::Updated(updated))
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Send one request, logging a failure exactly once.
    async fn send(
        &self,
        operation: &'static str,
        request: ApiRequest,
    ) -> Result<Option<Value>, OrderError> {
        let path = request.path();
        match self.transport.send(request).await {
            Ok(body) => {
                debug!(operation, path = %path, has_body = body.is_some(), "Order API call succeeded");
                Ok(body)
            }
            Err(e) => {
                error!(operation, path = %path, error = %e, "Order API call failed");
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        id: &OrderId,
        command: &Command,
        if_match: Option<String>,
    ) -> Result<Option<Value>, OrderError> {
        let operation = command.operation();
        let request = command
            .request(id)
            .inspect_err(|e| error!(operation, error = %e, "Failed to build request"))?
            .with_if_match(if_match);
        self.send(operation, request).await
    }

    async fn run_for_order(
        &self,
        id: &OrderId,
        command: &Command,
        if_match: Option<String>,
    ) -> Result<Order, OrderError> {
        let operation = command.operation();
        let body = self.run(id, command, if_match).await?;

        if body.is_none() && matches!(command, Command::SetPaymentStatus(_)) {
            error!(operation, "Server returned success without an order");
            return Err(OrderError::EmptyResponse { operation });
        }

        decode_required(operation, body, ORDER_ENVELOPE_KEYS)
    }

    async fn run_for_ack(
        &self,
        id: &OrderId,
        command: &Command,
        if_match: Option<String>,
    ) -> Result<RefundAck, OrderError> {
        let operation = command.operation();
        match self.run(id, command, if_match).await? {
            Some(body) => decode(operation, body),
            None => Ok(RefundAck::default()),
        }
    }

    async fn fetch_list(
        &self,
        operation: &'static str,
        request: ApiRequest,
    ) -> Result<Vec<Order>, OrderError> {
        let body = self.send(operation, request).await?;
        let orders: Vec<Order> = decode_required(operation, body, LIST_ENVELOPE_KEYS)?;
        orders.iter().for_each(warn_inconsistent);
        debug!(operation, count = orders.len(), "Orders listed");
        Ok(orders)
    }
}

/// Strip a `{ "<key>": ... }` envelope if present.
fn unwrap_envelope(value: Value, keys: &[&str]) -> Value {
    match value {
        Value::Object(mut map) => {
            let key = keys.iter().find(|key| {
                map.get(**key)
                    .is_some_and(|inner| inner.is_object() || inner.is_array())
            });
            match key.and_then(|key| map.remove(*key)) {
                Some(inner) => inner,
                None => Value::Object(map),
            }
        }
        other => other,
    }
}

fn decode<D: DeserializeOwned>(operation: &'static str, body: Value) -> Result<D, OrderError> {
    serde_json::from_value(body).map_err(|e| {
        error!(operation, error = %e, "Failed to parse order API response");
        OrderError::Parse(format!("{operation}: {e}"))
    })
}

fn decode_required<D: DeserializeOwned>(
    operation: &'static str,
    body: Option<Value>,
    envelope_keys: &[&str],
) -> Result<D, OrderError> {
    let Some(body) = body else {
        error!(operation, "Order API returned no body");
        return Err(OrderError::Parse(format!("{operation}: empty response body")));
    };
    decode(operation, unwrap_envelope(body, envelope_keys))
}

/// Log items whose server-computed total disagrees with `quantity * price`.
fn warn_inconsistent(order: &Order) {
    for (index, item) in order.inconsistent_items() {
        warn!(
            order_id = %order.id,
            index,
            quantity = item.quantity,
            price = %item.price,
            total_price = %item.total_price,
            "Line total does not equal quantity * price"
        );
    }
}
