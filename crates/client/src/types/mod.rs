//! Wire types for the order API.
//!
//! Field names follow the server's camelCase JSON. Unknown fields are
//! ignored on read so newer servers stay compatible.

mod order;
mod requests;

pub use order::{
    Order, OrderItem, ProductRef, ProductSummary, RefundInfo, ShippingAddress, UserRef,
    UserSummary,
};
pub use requests::{
    BankInfo, DraftItem, OrderDraft, RefundAck, RefundApproval, RefundRejection, RefundRequest,
};
