//! Status, payment and refund transitions.

use std::io::Write;

use orderdesk_client::{Command, CommandOutcome, OrderClient, Transport};
use orderdesk_core::{Next, OrderId};

use super::{CliError, write_json};

/// Send `command` straight to the server.
pub async fn unchecked<T: Transport, W: Write>(
    client: &OrderClient<T>,
    id: &OrderId,
    command: Command,
    out: &mut W,
) -> Result<(), CliError> {
    match command {
        Command::SetStatus(status) => write_json(out, &client.update_status(id, status).await?),
        Command::SetPaymentStatus(status) => {
            write_json(out, &client.update_payment_status(id, status).await?)
        }
        Command::MarkPaid => write_json(out, &client.mark_paid(id).await?),
        Command::Cancel { reason } => {
            write_json(out, &client.cancel_order(id, reason.as_deref()).await?)
        }
        Command::RequestRefund(request) => {
            write_json(out, &client.request_refund(id, &request).await?)
        }
        Command::ApproveRefund(approval) => {
            write_json(out, &client.approve_refund(id, &approval).await?)
        }
        Command::RejectRefund(rejection) => {
            write_json(out, &client.reject_refund(id, &rejection).await?)
        }
    }
}

/// Fetch the order, check the transition locally, then send `command`.
pub async fn checked<T: Transport, W: Write>(
    client: &OrderClient<T>,
    id: &OrderId,
    command: Command,
    out: &mut W,
) -> Result<(), CliError> {
    let order = client.get_order(id).await?;
    match client.execute(&order, command).await? {
        CommandOutcome::Updated(order) => {
            tracing::info!(
                order_id = %order.id,
                status = %order.status,
                payment_status = %order.payment_status,
                "Order updated"
            );
            write_json(out, &order)
        }
        CommandOutcome::Acknowledged { ack, expected } => {
            match expected {
                Next::Known(state) => tracing::info!(
                    order_id = %id,
                    status = %state.status,
                    payment_status = %state.payment_status,
                    "Refund operation acknowledged"
                ),
                Next::ServerDecides => tracing::info!(
                    order_id = %id,
                    "Refund operation acknowledged; run `orderdesk get` to see the resulting status"
                ),
            }
            write_json(out, &ack)
        }
    }
}
