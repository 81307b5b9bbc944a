//! Order domain types as returned by the order API.

use chrono::{DateTime, Utc};
use orderdesk_core::{Money, OrderId, OrderState, OrderStatus, PaymentStatus, ProductId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::requests::BankInfo;

// =============================================================================
// Order
// =============================================================================

/// A customer order.
///
/// Orders are read-only on the client: they change only through the
/// operations on [`OrderClient`](crate::OrderClient).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "WireOrder")]
pub struct Order {
    /// Server-assigned id.
    #[serde(alias = "_id")]
    pub id: OrderId,
    /// Human-facing order number.
    #[serde(default)]
    pub order_number: String,
    /// Owner of the order, as an id or a populated document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRef>,
    /// Order status.
    pub status: OrderStatus,
    /// Payment status.
    pub payment_status: PaymentStatus,
    /// Order total as computed by the server.
    #[serde(default)]
    pub total_amount: Money,
    /// Where the order ships to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<ShippingAddress>,
    /// Payment method label (e.g. `cod`, `bank_transfer`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    /// Line items, in order.
    #[serde(default)]
    pub items: Vec<OrderItem>,
    /// Present once a refund has been requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_info: Option<RefundInfo>,
    /// Document version used for `If-Match`. Read from `version`, falling
    /// back to `__v`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Order as it appears on the wire, where the version may arrive as
/// `version`, `__v`, or both.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireOrder {
    #[serde(alias = "_id")]
    id: OrderId,
    #[serde(default)]
    order_number: String,
    #[serde(default)]
    user: Option<UserRef>,
    status: OrderStatus,
    payment_status: PaymentStatus,
    #[serde(default)]
    total_amount: Money,
    #[serde(default)]
    shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    payment_method: Option<String>,
    #[serde(default)]
    items: Vec<OrderItem>,
    #[serde(default)]
    refund_info: Option<RefundInfo>,
    #[serde(default)]
    version: Option<u64>,
    #[serde(default, rename = "__v")]
    document_version: Option<u64>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl From<WireOrder> for Order {
    fn from(wire: WireOrder) -> Self {
        Self {
            id: wire.id,
            order_number: wire.order_number,
            user: wire.user,
            status: wire.status,
            payment_status: wire.payment_status,
            total_amount: wire.total_amount,
            shipping_address: wire.shipping_address,
            payment_method: wire.payment_method,
            items: wire.items,
            refund_info: wire.refund_info,
            version: wire.version.or(wire.document_version),
            created_at: wire.created_at,
            updated_at: wire.updated_at,
        }
    }
}

impl Order {
    /// The status pair that drives the lifecycle table.
    #[must_use]
    pub const fn state(&self) -> OrderState {
        OrderState::from_parts(self.status, self.payment_status)
    }

    /// Items whose `totalPrice` differs from `quantity * price`.
    pub fn inconsistent_items(&self) -> impl Iterator<Item = (usize, &OrderItem)> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| !item.is_consistent())
    }

    /// Total number of units across all items.
    #[must_use]
    pub fn unit_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }
}

// =============================================================================
// Line Items
// =============================================================================

/// A line item on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Product reference.
    pub product: ProductRef,
    /// Product name captured when the order was placed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Units ordered.
    pub quantity: u32,
    /// Unit price.
    pub price: Money,
    /// `quantity * price`, computed by the server.
    pub total_price: Money,
}

impl OrderItem {
    /// Whether the server's line total equals `quantity * price`.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.price.times(self.quantity) == Some(self.total_price)
    }
}

/// A product as referenced from an order item.
///
/// The server returns either the bare id or the populated product document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductRef {
    /// Bare product id.
    Id(ProductId),
    /// Populated product summary.
    Populated(ProductSummary),
}

impl ProductRef {
    /// The referenced product id.
    #[must_use]
    pub const fn id(&self) -> &ProductId {
        match self {
            Self::Id(id) => id,
            Self::Populated(summary) => &summary.id,
        }
    }

    /// Product name, if the reference was populated.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Id(_) => None,
            Self::Populated(summary) => summary.name.as_deref(),
        }
    }
}

/// Populated product fields embedded in an order item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    /// Product id.
    #[serde(alias = "_id")]
    pub id: ProductId,
    /// Product name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Main image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// The owner of an order, as an id or a populated user document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    /// Bare user id.
    Id(UserId),
    /// Populated user summary.
    Populated(UserSummary),
}

impl UserRef {
    /// The referenced user id.
    #[must_use]
    pub const fn id(&self) -> &UserId {
        match self {
            Self::Id(id) => id,
            Self::Populated(summary) => &summary.id,
        }
    }
}

/// Populated user fields embedded in an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    /// User id.
    #[serde(alias = "_id")]
    pub id: UserId,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

// =============================================================================
// Address & Refund Info
// =============================================================================

/// Shipping address. Not validated client-side.
///
/// Fields the client does not know about are preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    /// Recipient name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Contact phone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Street address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// City or province.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Postal code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// Country.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Any other address fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Refund details attached to an order once a refund was requested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundInfo {
    /// Why the customer asked for a refund.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// When the refund was requested or completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_date: Option<DateTime<Utc>>,
    /// Payment provider or bank transaction reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// Free-form notes from the customer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// How the refund was paid out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_method: Option<String>,
    /// Amount refunded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_amount: Option<Money>,
    /// Note left by the admin who decided the refund.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_note: Option<String>,
    /// Where to send the money.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_info: Option<BankInfo>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample() -> Value {
        json!({
            "_id": "665f1c2a9d3e4b0012ab34cd",
            "orderNumber": "ORD-20240601-0001",
            "user": {"_id": "u-1", "name": "Lan Nguyen", "email": "lan@example.com"},
            "status": "processing",
            "paymentStatus": "paid",
            "totalAmount": 25000,
            "shippingAddress": {
                "fullName": "Lan Nguyen",
                "phone": "0900000000",
                "address": "12 Hang Bac",
                "city": "Hanoi",
                "ward": "Hang Bac"
            },
            "paymentMethod": "bank_transfer",
            "items": [
                {"product": {"_id": "p-1", "name": "Tea", "image": "/tea.png"},
                 "quantity": 2, "price": 10000, "totalPrice": 20000},
                {"product": "p-2", "quantity": 1, "price": 5000, "totalPrice": 5000}
            ],
            "__v": 3,
            "createdAt": "2024-06-01T08:00:00.000Z"
        })
    }

    #[test]
    fn test_order_deserialization() {
        let order: Order = serde_json::from_value(sample()).unwrap();
        assert_eq!(order.id.as_str(), "665f1c2a9d3e4b0012ab34cd");
        assert_eq!(order.order_number, "ORD-20240601-0001");
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert_eq!(order.total_amount, Money::from_units(25_000));
        assert_eq!(order.version, Some(3));
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.user.as_ref().unwrap().id().as_str(), "u-1");
        assert!(order.created_at.is_some());
        assert!(order.refund_info.is_none());
    }

    #[test]
    fn test_product_ref_variants() {
        let order: Order = serde_json::from_value(sample()).unwrap();
        let first = &order.items[0].product;
        let second = &order.items[1].product;
        assert_eq!(first.id().as_str(), "p-1");
        assert_eq!(first.name(), Some("Tea"));
        assert_eq!(second, &ProductRef::Id(ProductId::new("p-2")));
        assert_eq!(second.name(), None);
    }

    #[test]
    fn test_shipping_address_keeps_unknown_fields() {
        let order: Order = serde_json::from_value(sample()).unwrap();
        let address = order.shipping_address.unwrap();
        assert_eq!(address.city.as_deref(), Some("Hanoi"));
        assert_eq!(address.extra.get("ward"), Some(&json!("Hang Bac")));
    }

    #[test]
    fn test_line_total_consistency() {
        let mut order: Order = serde_json::from_value(sample()).unwrap();
        assert!(order.items.iter().all(OrderItem::is_consistent));
        assert_eq!(order.inconsistent_items().count(), 0);
        assert_eq!(order.unit_count(), 3);

        order.items[1].total_price = Money::from_units(4_000);
        let bad: Vec<usize> = order.inconsistent_items().map(|(i, _)| i).collect();
        assert_eq!(bad, vec![1]);
    }

    #[test]
    fn test_state() {
        let order: Order = serde_json::from_value(sample()).unwrap();
        assert_eq!(
            order.state(),
            OrderState::from_parts(OrderStatus::Processing, PaymentStatus::Paid)
        );
    }

    #[test]
    fn test_refund_info() {
        let mut value = sample();
        value["status"] = json!("refund_requested");
        value["refundInfo"] = json!({
            "reason": "damaged",
            "refundDate": "2024-06-03T10:00:00Z",
            "notes": "box crushed",
            "bankInfo": {"bankName": "VCB", "accountNumber": "0123", "accountName": "LAN NGUYEN"}
        });
        let order: Order = serde_json::from_value(value).unwrap();
        let refund = order.refund_info.unwrap();
        assert_eq!(refund.reason.as_deref(), Some("damaged"));
        assert_eq!(refund.bank_info.unwrap().bank_name, "VCB");
        assert!(refund.transaction_id.is_none());
    }

    #[test]
    fn test_version_from_either_key() {
        let mut value = sample();
        value["version"] = json!(7);
        let both: Order = serde_json::from_value(value).unwrap();
        assert_eq!(both.version, Some(7));

        let mut value = sample();
        value.as_object_mut().unwrap().remove("__v");
        value["version"] = json!(2);
        let modern: Order = serde_json::from_value(value).unwrap();
        assert_eq!(modern.version, Some(2));

        let reparsed: Order =
            serde_json::from_value(serde_json::to_value(&modern).unwrap()).unwrap();
        assert_eq!(reparsed, modern);
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let mut value = sample();
        value["status"] = json!("shipped");
        assert!(serde_json::from_value::<Order>(value).is_err());
    }
}
