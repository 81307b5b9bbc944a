//! Orderdesk CLI - Manage orders and refunds from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # List every order (admin) or only your own
//! orderdesk list
//! orderdesk list --mine
//!
//! # Place an order from a JSON draft
//! orderdesk create --file draft.json
//!
//! # Move an order along, checking the lifecycle locally first
//! orderdesk --checked status 665f1c2a9d3e4b0012ab34cd processing
//!
//! # Refunds
//! orderdesk request-refund <id> --reason damaged
//! orderdesk approve-refund <id> --method bank_transfer --amount 25000
//! ```
//!
//! # Environment Variables
//!
//! - `ORDER_API_BASE_URL` - Base URL of the order API (required)
//! - `ORDER_API_TOKEN` - Bearer token
//! - `ORDER_API_TIMEOUT_SECS` - Request timeout, default 30
//! - `ORDERDESK_LOG_JSON` - Emit JSON logs when set

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use orderdesk_client::{BankInfo, Command, OrderClient, RefundApproval, RefundRejection, RefundRequest};
use orderdesk_core::{Money, OrderId, OrderStatus, PaymentStatus};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "orderdesk")]
#[command(author, version, about = "Order and refund lifecycle tools")]
struct Cli {
    /// Fetch the order first and refuse transitions the lifecycle forbids
    #[arg(long, global = true)]
    checked: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List orders
    List {
        /// Only orders of the authenticated user
        #[arg(long)]
        mine: bool,
    },
    /// Show one order
    Get {
        /// Order id
        id: OrderId,
    },
    /// Place an order from a JSON draft
    Create {
        /// Path to the draft (`items`, `shippingAddress`, `paymentMethod`)
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Set the order status
    Status {
        /// Order id
        id: OrderId,
        /// New status (`pending`, `processing`, `completed`, `cancelled`, ...)
        status: OrderStatus,
    },
    /// Mark an order paid, or set an explicit payment status
    Pay {
        /// Order id
        id: OrderId,
        /// Payment status (`pending`, `paid`, `refunded`)
        #[arg(short, long)]
        status: Option<PaymentStatus>,
    },
    /// Cancel an order
    Cancel {
        /// Order id
        id: OrderId,
        /// Cancellation reason
        #[arg(short, long)]
        reason: Option<String>,
    },
    /// Ask for a refund
    RequestRefund {
        /// Order id
        id: OrderId,
        /// Why the refund is needed
        #[arg(short, long)]
        reason: String,
        /// Additional notes
        #[arg(long)]
        notes: Option<String>,
        /// Bank name for the payout
        #[arg(long, requires_all = ["account_number", "account_name"])]
        bank_name: Option<String>,
        /// Bank account number
        #[arg(long, requires = "bank_name")]
        account_number: Option<String>,
        /// Bank account holder
        #[arg(long, requires = "bank_name")]
        account_name: Option<String>,
    },
    /// Approve a pending refund
    ApproveRefund {
        /// Order id
        id: OrderId,
        /// Payout method (e.g. `bank_transfer`, `cash`)
        #[arg(short, long)]
        method: String,
        /// Amount to refund
        #[arg(short, long)]
        amount: Money,
        /// Admin note
        #[arg(short, long)]
        note: Option<String>,
        /// Skip the inventory import voucher
        #[arg(long)]
        no_voucher: bool,
    },
    /// Reject a pending refund
    RejectRefund {
        /// Order id
        id: OrderId,
        /// Admin note
        #[arg(short, long)]
        note: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "orderdesk=info".into());

    let json = std::env::var_os("ORDERDESK_LOG_JSON").is_some();
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let client = OrderClient::from_env()?;
    let mut out = std::io::stdout().lock();
    let checked = cli.checked;

    let (id, command) = match cli.command {
        Commands::List { mine } => return commands::orders::list(&client, mine, &mut out).await,
        Commands::Get { id } => return commands::orders::get(&client, &id, &mut out).await,
        Commands::Create { file } => {
            return commands::orders::create(&client, &file, &mut out).await;
        }
        Commands::Status { id, status } => (id, Command::SetStatus(status)),
        Commands::Pay { id, status } => (
            id,
            status.map_or(Command::MarkPaid, Command::SetPaymentStatus),
        ),
        Commands::Cancel { id, reason } => (id, Command::Cancel { reason }),
        Commands::RequestRefund {
            id,
            reason,
            notes,
            bank_name,
            account_number,
            account_name,
        } => {
            let mut request = RefundRequest::new(reason);
            request.notes = notes;
            if let (Some(bank_name), Some(account_number), Some(account_name)) =
                (bank_name, account_number, account_name)
            {
                request = request.with_bank_info(BankInfo {
                    bank_name,
                    account_number,
                    account_name,
                });
            }
            (id, Command::RequestRefund(request))
        }
        Commands::ApproveRefund {
            id,
            method,
            amount,
            note,
            no_voucher,
        } => {
            let mut approval = RefundApproval::new(method, amount).with_import_voucher(!no_voucher);
            approval.admin_note = note;
            (id, Command::ApproveRefund(approval))
        }
        Commands::RejectRefund { id, note } => {
            (id, Command::RejectRefund(RefundRejection { admin_note: note }))
        }
    };

    if checked {
        commands::lifecycle::checked(&client, &id, command, &mut out).await
    } else {
        commands::lifecycle::unchecked(&client, &id, command, &mut out).await
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_checked_status() {
        let cli = Cli::try_parse_from(["orderdesk", "--checked", "status", "o-1", "processing"])
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(cli.checked);
        assert!(matches!(
            cli.command,
            Commands::Status {
                status: OrderStatus::Processing,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_status() {
        assert!(Cli::try_parse_from(["orderdesk", "status", "o-1", "shipped"]).is_err());
    }

    #[test]
    fn test_parse_approve_refund_amount() {
        let cli = Cli::try_parse_from([
            "orderdesk",
            "approve-refund",
            "o-1",
            "--method",
            "bank_transfer",
            "--amount",
            "25000",
        ])
        .unwrap_or_else(|e| panic!("{e}"));
        match cli.command {
            Commands::ApproveRefund {
                amount, no_voucher, ..
            } => {
                assert_eq!(amount, Money::from_units(25_000));
                assert!(!no_voucher);
            }
            _ => panic!("expected approve-refund"),
        }
    }

    #[test]
    fn test_bank_info_requires_all_fields() {
        assert!(
            Cli::try_parse_from([
                "orderdesk",
                "request-refund",
                "o-1",
                "--reason",
                "damaged",
                "--bank-name",
                "VCB",
            ])
            .is_err()
        );
    }
}
