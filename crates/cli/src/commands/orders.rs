//! Read and create commands.

use std::io::Write;
use std::path::Path;

use orderdesk_client::{OrderClient, OrderDraft, Transport};
use orderdesk_core::OrderId;

use super::{CliError, write_json};

/// `orderdesk list [--mine]`
pub async fn list<T: Transport, W: Write>(
    client: &OrderClient<T>,
    mine: bool,
    out: &mut W,
) -> Result<(), CliError> {
    let orders = if mine {
        client.list_my_orders().await?
    } else {
        client.list_orders().await?
    };
    tracing::info!(count = orders.len(), mine, "Listed orders");
    write_json(out, &orders)
}

/// `orderdesk get <id>`
pub async fn get<T: Transport, W: Write>(
    client: &OrderClient<T>,
    id: &OrderId,
    out: &mut W,
) -> Result<(), CliError> {
    let order = client.get_order(id).await?;
    write_json(out, &order)
}

/// `orderdesk create --file <draft.json>`
pub async fn create<T: Transport, W: Write>(
    client: &OrderClient<T>,
    path: &Path,
    out: &mut W,
) -> Result<(), CliError> {
    let draft = read_draft(path)?;
    let order = client.create_order(&draft).await?;
    tracing::info!(
        order_id = %order.id,
        order_number = %order.order_number,
        total = %order.total_amount,
        "Created order"
    );
    write_json(out, &order)
}

fn read_draft(path: &Path) -> Result<OrderDraft, CliError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CliError::ReadDraft {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| CliError::ParseDraft {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use orderdesk_client::MockTransport;
    use serde_json::{Value, json};

    use super::*;

    fn order_json() -> Value {
        json!({
            "_id": "o-1",
            "orderNumber": "ORD-1",
            "status": "pending",
            "paymentStatus": "pending",
            "totalAmount": 5000,
            "items": [{"product": "p-1", "quantity": 1, "price": 5000, "totalPrice": 5000}]
        })
    }

    #[tokio::test]
    async fn test_list_mine_hits_user_route() {
        let client = OrderClient::new(MockTransport::new());
        client.transport().respond_with(json!([order_json()]));

        let mut out = Vec::new();
        list(&client, true, &mut out).await.unwrap();

        let printed: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(printed[0]["orderNumber"], json!("ORD-1"));
        assert_eq!(
            client.transport().last_request().unwrap().path(),
            "/api/orders/user"
        );
    }

    #[tokio::test]
    async fn test_create_reads_draft_file() {
        let path = std::env::temp_dir().join(format!("orderdesk-draft-{}.json", std::process::id()));
        std::fs::write(
            &path,
            json!({
                "items": [{"product": "p-1", "quantity": 1, "price": 5000}],
                "shippingAddress": {"fullName": "Lan"},
                "paymentMethod": "cod"
            })
            .to_string(),
        )
        .unwrap();

        let client = OrderClient::new(MockTransport::new());
        client.transport().respond_with(order_json());

        let mut out = Vec::new();
        create(&client, &path, &mut out).await.unwrap();
        std::fs::remove_file(&path).ok();

        let sent = client.transport().last_request().unwrap().body.unwrap();
        assert_eq!(sent["paymentMethod"], json!("cod"));
        let printed: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(printed["id"], json!("o-1"));
    }

    #[tokio::test]
    async fn test_create_missing_file() {
        let client = OrderClient::new(MockTransport::new());
        let mut out = Vec::new();
        let err = create(&client, Path::new("/nonexistent/draft.json"), &mut out)
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::ReadDraft { .. }));
        assert_eq!(client.transport().request_count(), 0);
    }
}
