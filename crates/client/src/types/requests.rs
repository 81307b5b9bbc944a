//! Request payloads and acknowledgments for order operations.

use orderdesk_core::{Money, ProductId};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::order::{Order, ShippingAddress};

// =============================================================================
// Create Order
// =============================================================================

/// A new order as submitted by the client.
///
/// Line totals and the order total are computed by the server; the draft
/// carries only quantities and unit prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    /// Items to order.
    pub items: Vec<DraftItem>,
    /// Where to ship.
    pub shipping_address: ShippingAddress,
    /// Payment method label.
    pub payment_method: String,
    /// Optional note for the shop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A line item in an [`OrderDraft`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftItem {
    /// Product to order.
    pub product: ProductId,
    /// Units to order.
    pub quantity: u32,
    /// Unit price shown to the customer.
    pub price: Money,
}

impl DraftItem {
    /// Create a draft line item.
    #[must_use]
    pub fn new(product: impl Into<ProductId>, quantity: u32, price: Money) -> Self {
        Self {
            product: product.into(),
            quantity,
            price,
        }
    }
}

// =============================================================================
// Refund Requests
// =============================================================================

/// Bank account that should receive a refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankInfo {
    /// Bank name.
    pub bank_name: String,
    /// Account number.
    pub account_number: String,
    /// Account holder name.
    pub account_name: String,
}

/// Input for requesting a refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    /// Why the customer wants a refund.
    pub reason: String,
    /// Additional notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Where to send the money.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_info: Option<BankInfo>,
}

impl RefundRequest {
    /// Request a refund for `reason`.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            notes: None,
            bank_info: None,
        }
    }

    /// Attach notes.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Attach bank details.
    #[must_use]
    pub fn with_bank_info(mut self, bank_info: BankInfo) -> Self {
        self.bank_info = Some(bank_info);
        self
    }
}

/// Input for approving a refund.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundApproval {
    /// How the refund is paid out (e.g. `bank_transfer`, `cash`).
    pub refund_method: String,
    /// Amount to refund.
    pub refund_amount: Money,
    /// Note from the approving admin.
    pub admin_note: Option<String>,
    /// Whether the server should create an inventory import voucher for the
    /// returned goods. Unset means yes.
    pub create_import_voucher: Option<bool>,
}

impl RefundApproval {
    /// Approve a refund of `refund_amount` paid out via `refund_method`.
    #[must_use]
    pub fn new(refund_method: impl Into<String>, refund_amount: Money) -> Self {
        Self {
            refund_method: refund_method.into(),
            refund_amount,
            admin_note: None,
            create_import_voucher: None,
        }
    }

    /// Attach an admin note.
    #[must_use]
    pub fn with_admin_note(mut self, note: impl Into<String>) -> Self {
        self.admin_note = Some(note.into());
        self
    }

    /// Choose whether to create an import voucher.
    #[must_use]
    pub const fn with_import_voucher(mut self, create: bool) -> Self {
        self.create_import_voucher = Some(create);
        self
    }

    /// Wire body; an unset voucher flag is sent as `true`.
    pub(crate) fn body(&self) -> ApproveRefundBody<'_> {
        ApproveRefundBody {
            refund_method: &self.refund_method,
            refund_amount: self.refund_amount,
            admin_note: self.admin_note.as_deref(),
            create_import_voucher: self.create_import_voucher.unwrap_or(true),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApproveRefundBody<'a> {
    refund_method: &'a str,
    refund_amount: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    admin_note: Option<&'a str>,
    create_import_voucher: bool,
}

/// Input for rejecting a refund.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRejection {
    /// Note from the rejecting admin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_note: Option<String>,
}

impl RefundRejection {
    /// Reject with an explanatory note.
    #[must_use]
    pub fn with_note(note: impl Into<String>) -> Self {
        Self {
            admin_note: Some(note.into()),
        }
    }
}

// =============================================================================
// Acknowledgment
// =============================================================================

/// Server acknowledgment returned by the refund operations.
///
/// The payload is loosely specified; known fields are lifted out and the rest
/// is kept in `extra`. Parsing never fails on the embedded order: the refund
/// has already been applied server-side by the time the ack arrives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundAck {
    /// Whether the server reports success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    /// Human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Updated order, when the server includes it as a full document with
    /// known statuses. Bare ids and unrecognised shapes read as `None`.
    #[serde(
        default,
        deserialize_with = "lenient_order",
        skip_serializing_if = "Option::is_none"
    )]
    pub order: Option<Order>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn lenient_order<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Order>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| {
        serde_json::from_value(value)
            .inspect_err(|e| tracing::debug!(error = %e, "Ignoring unrecognised order in refund ack"))
            .ok()
    }))
}

impl RefundAck {
    /// Look up a field anywhere in the acknowledgment: top level, `extra`,
    /// a nested `data` object, or the embedded order's `refundInfo`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.extra.get(name) {
            return Some(value.clone());
        }
        if let Some(value) = self
            .extra
            .get("data")
            .and_then(Value::as_object)
            .and_then(|data| data.get(name))
        {
            return Some(value.clone());
        }
        let refund_info = self.order.as_ref()?.refund_info.as_ref()?;
        serde_json::to_value(refund_info)
            .ok()?
            .get(name)
            .cloned()
    }

    /// Refunded amount, if the server echoed one back.
    #[must_use]
    pub fn refund_amount(&self) -> Option<Money> {
        self.field("refundAmount")
            .and_then(|value| serde_json::from_value(value).ok())
    }
}
