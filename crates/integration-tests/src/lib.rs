//! Integration tests for Orderdesk.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory scenarios (no server needed)
//! cargo test -p orderdesk-integration-tests
//!
//! # Against a live order API
//! ORDER_API_BASE_URL=http://localhost:5000 ORDER_API_TOKEN=... \
//!     cargo test -p orderdesk-integration-tests -- --ignored
//! ```
//!
//! [`FakeOrderApi`] is an in-memory [`Transport`] that behaves like the order
//! server: it computes line and order totals, enforces the order lifecycle,
//! bumps the document version on every write and honours `If-Match`.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use orderdesk_client::{
    ApiRequest, DraftItem, Order, OrderDraft, OrderError, OrderItem, ProductRef, RefundInfo,
    RefundRejection, RefundRequest, ShippingAddress, Transport, UserRef,
};
use orderdesk_core::{Money, Next, OrderId, OrderStatus, PaymentStatus, Transition, UserId};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

/// Status the fake server moves an order to when a refund is rejected.
pub const REJECTED_REFUND_STATUS: OrderStatus = OrderStatus::Completed;

#[derive(Debug, Default)]
struct FakeState {
    orders: Vec<Order>,
    requests: Vec<ApiRequest>,
    next_number: u32,
}

/// In-memory stand-in for the order API.
#[derive(Debug)]
pub struct FakeOrderApi {
    user: UserId,
    state: Mutex<FakeState>,
}

impl Default for FakeOrderApi {
    fn default() -> Self {
        Self::new("user-1")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusBody {
    status: OrderStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentBody {
    payment_status: PaymentStatus,
}

#[derive(Debug, Default, Deserialize)]
struct CancelBody {
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApproveBody {
    refund_method: String,
    refund_amount: Money,
    admin_note: Option<String>,
    #[serde(default = "default_true")]
    create_import_voucher: bool,
}

const fn default_true() -> bool {
    true
}

impl FakeOrderApi {
    /// Create a fake server whose authenticated caller is `user`.
    #[must_use]
    pub fn new(user: impl Into<UserId>) -> Self {
        Self {
            user: user.into(),
            state: Mutex::new(FakeState::default()),
        }
    }

    /// Store `order` as-is, replacing any order with the same id.
    pub fn seed(&self, order: Order) {
        let mut state = self.lock();
        state.orders.retain(|existing| existing.id != order.id);
        state.orders.push(order);
    }

    /// Current server-side copy of an order.
    #[must_use]
    pub fn order(&self, id: &OrderId) -> Option<Order> {
        self.lock().orders.iter().find(|o| &o.id == id).cloned()
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle(&self, request: ApiRequest) -> Result<Option<Value>, OrderError> {
        let mut state = self.lock();
        state.requests.push(request.clone());

        let segments: Vec<&str> = request.segments.iter().map(String::as_str).collect();
        match (request.method.as_str(), segments.as_slice()) {
            ("GET", ["api", "orders"]) => Ok(Some(json!({ "orders": state.orders }))),
            ("GET", ["api", "orders", "user"]) => {
                let mine: Vec<&Order> = state
                    .orders
                    .iter()
                    .filter(|o| o.user.as_ref().map(UserRef::id) == Some(&self.user))
                    .collect();
                Ok(Some(json!(mine)))
            }
            ("GET", ["api", "orders", id]) => {
                let order = find(&state, id)?;
                Ok(Some(json!({ "success": true, "data": order })))
            }
            ("POST", ["api", "orders"]) => {
                let draft: OrderDraft = parse(request.body.as_ref())?;
                let order = self.place(&mut state, draft)?;
                Ok(Some(json!(order)))
            }
            ("PUT" | "POST", ["api", "orders", id, action]) => {
                let index = position(&state, id)?;
                let order = state
                    .orders
                    .get_mut(index)
                    .ok_or_else(|| not_found(id))?;
                check_version(order, request.if_match.as_deref())?;
                apply(order, action, request.body.as_ref())
            }
            (method, _) => Err(OrderError::Api {
                status: 404,
                message: format!("Cannot {method} {}", request.path()),
            }),
        }
    }

    fn place(&self, state: &mut FakeState, draft: OrderDraft) -> Result<Order, OrderError> {
        if draft.items.is_empty() {
            return Err(bad_request("Order must contain at least one item"));
        }

        let mut items = Vec::with_capacity(draft.items.len());
        let mut total = Money::ZERO;
        for item in draft.items {
            let line = item
                .price
                .times(item.quantity)
                .ok_or_else(|| bad_request("Line total overflows"))?;
            total = total
                .checked_add(line)
                .ok_or_else(|| bad_request("Order total overflows"))?;
            items.push(OrderItem {
                product: ProductRef::Id(item.product),
                name: None,
                quantity: item.quantity,
                price: item.price,
                total_price: line,
            });
        }

        state.next_number += 1;
        let number = state.next_number;
        let order = Order {
            id: OrderId::new(format!("ord-{number}")),
            order_number: format!("ORD-{number:04}"),
            user: Some(UserRef::Id(self.user.clone())),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            total_amount: total,
            shipping_address: Some(draft.shipping_address),
            payment_method: Some(draft.payment_method),
            items,
            refund_info: None,
            version: Some(0),
            created_at: None,
            updated_at: None,
        };
        state.orders.push(order.clone());
        Ok(order)
    }
}

impl Transport for FakeOrderApi {
    fn send(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<Option<Value>, OrderError>> + Send {
        std::future::ready(self.handle(request))
    }
}

/// Apply one lifecycle action to `order` and build the response body.
fn apply(
    order: &mut Order,
    action: &str,
    body: Option<&Value>,
) -> Result<Option<Value>, OrderError> {
    match action {
        "status" => {
            let StatusBody { status } = parse(body)?;
            advance(order, Transition::SetStatus(status))?;
            Ok(Some(json!(order)))
        }
        "pay" => {
            let transition = match body {
                Some(body) => {
                    let PaymentBody { payment_status } = parse(Some(body))?;
                    Transition::SetPaymentStatus(payment_status)
                }
                None => Transition::MarkPaid,
            };
            advance(order, transition)?;
            Ok(Some(json!({ "success": true, "data": order })))
        }
        "cancel" => {
            let cancel: CancelBody =
                body.map_or_else(|| Ok(CancelBody::default()), |b| parse(Some(b)))?;
            advance(order, Transition::Cancel)?;
            Ok(Some(json!({
                "success": true,
                "message": cancel.reason.map_or_else(
                    || "Order cancelled".to_owned(),
                    |reason| format!("Order cancelled: {reason}"),
                ),
                "order": order
            })))
        }
        "request-refund" => {
            let request: RefundRequest = parse(body)?;
            advance(order, Transition::RequestRefund)?;
            order.refund_info = Some(RefundInfo {
                reason: Some(request.reason),
                notes: request.notes,
                bank_info: request.bank_info,
                ..RefundInfo::default()
            });
            Ok(Some(json!({
                "success": true,
                "message": "Refund request submitted",
                "order": order
            })))
        }
        "approve-refund" => {
            let approval: ApproveBody = parse(body)?;
            if approval.refund_amount > order.total_amount {
                return Err(bad_request("Refund amount exceeds order total"));
            }
            advance(order, Transition::ApproveRefund)?;
            let info = order.refund_info.get_or_insert_with(RefundInfo::default);
            info.refund_method = Some(approval.refund_method.clone());
            info.refund_amount = Some(approval.refund_amount);
            info.admin_note = approval.admin_note;
            Ok(Some(json!({
                "success": true,
                "message": "Refund approved",
                "data": {
                    "refundAmount": approval.refund_amount,
                    "refundMethod": approval.refund_method,
                    "importVoucherCreated": approval.create_import_voucher
                }
            })))
        }
        "reject-refund" => {
            let rejection: RefundRejection =
                body.map_or_else(|| Ok(RefundRejection::default()), |b| parse(Some(b)))?;
            order
                .state()
                .apply(Transition::RejectRefund)
                .map_err(|e| bad_request(&e.to_string()))?;
            order.status = REJECTED_REFUND_STATUS;
            bump_version(order);
            order.refund_info.get_or_insert_with(RefundInfo::default).admin_note =
                rejection.admin_note;
            Ok(Some(json!({ "success": true, "message": "Refund rejected" })))
        }
        other => Err(OrderError::Api {
            status: 404,
            message: format!("Unknown order action: {other}"),
        }),
    }
}

/// Move `order` along the lifecycle, refusing transitions the table forbids.
fn advance(order: &mut Order, transition: Transition) -> Result<(), OrderError> {
    let next = order
        .state()
        .apply(transition)
        .map_err(|e| bad_request(&e.to_string()))?;
    if let Next::Known(state) = next {
        order.status = state.status;
        order.payment_status = state.payment_status;
    }
    bump_version(order);
    Ok(())
}

fn bump_version(order: &mut Order) {
    order.version = Some(order.version.unwrap_or(0) + 1);
}

fn check_version(order: &Order, if_match: Option<&str>) -> Result<(), OrderError> {
    let Some(expected) = if_match else {
        return Ok(());
    };
    let current = order.version.unwrap_or(0).to_string();
    if current == expected {
        Ok(())
    } else {
        Err(OrderError::Conflict(format!(
            "Order {} is at version {current}, not {expected}",
            order.id
        )))
    }
}

fn position(state: &FakeState, id: &str) -> Result<usize, OrderError> {
    state
        .orders
        .iter()
        .position(|o| o.id.as_str() == id)
        .ok_or_else(|| not_found(id))
}

fn find<'a>(state: &'a FakeState, id: &str) -> Result<&'a Order, OrderError> {
    state
        .orders
        .iter()
        .find(|o| o.id.as_str() == id)
        .ok_or_else(|| not_found(id))
}

fn parse<D: DeserializeOwned>(body: Option<&Value>) -> Result<D, OrderError> {
    let body = body.ok_or_else(|| bad_request("Missing request body"))?;
    serde_json::from_value(body.clone()).map_err(|e| bad_request(&e.to_string()))
}

fn not_found(id: &str) -> OrderError {
    OrderError::NotFound(format!("Order not found: {id}"))
}

fn bad_request(message: &str) -> OrderError {
    OrderError::Api {
        status: 400,
        message: message.to_owned(),
    }
}

/// A draft with `(product, quantity, unit price)` lines.
#[must_use]
pub fn draft(lines: &[(&str, u32, i64)]) -> OrderDraft {
    OrderDraft {
        items: lines
            .iter()
            .map(|&(product, quantity, price)| {
                DraftItem::new(product, quantity, Money::from_units(price))
            })
            .collect(),
        shipping_address: ShippingAddress {
            full_name: Some("Lan Nguyen".to_owned()),
            phone: Some("0900000000".to_owned()),
            address: Some("12 Hang Bac".to_owned()),
            city: Some("Hanoi".to_owned()),
            ..Default::default()
        },
        payment_method: "cod".to_owned(),
        notes: None,
    }
}
