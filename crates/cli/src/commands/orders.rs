//! Order management through the backoffice API.
//!
//! Every invocation logs in, performs one action and logs out again.

use clap::{Args, Subcommand};
use deskly_client::{BackofficeSession, ClientConfig, HttpBackoffice};
use deskly_core::{ApiError, OrderId, OrderStatus, PageRequest};
use secrecy::SecretString;
use tracing::warn;

use super::print_order;

#[derive(Debug, Args)]
pub struct OperatorLogin {
    /// Operator email
    #[arg(long, env = "DESKLY_OPERATOR_EMAIL", global = true)]
    email: Option<String>,

    /// Operator password
    #[arg(long, env = "DESKLY_OPERATOR_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum OrdersAction {
    /// List all orders, newest first
    List {
        /// Zero-based page number
        #[arg(long, default_value_t = 0)]
        page: u32,

        /// Page size (1-100)
        #[arg(long, default_value_t = 10)]
        size: u32,
    },
    /// Show one order
    Show { id: i64 },
    /// Set an order's status (e.g. `EM_TRANSITO`)
    SetStatus { id: i64, status: OrderStatus },
    /// Move a rejected order back to `PAGAMENTO_APROVADO`
    Reapprove { id: i64 },
    /// Show an order's status history
    History { id: i64 },
}

/// Log in as an operator and run `action`.
///
/// # Errors
///
/// Returns missing credentials, the login failure, or the action's failure.
pub async fn run(login: OperatorLogin, action: OrdersAction) -> Result<(), Box<dyn std::error::Error>> {
    let email = login.email.ok_or("--email or DESKLY_OPERATOR_EMAIL is required")?;
    let password = login
        .password
        .map(SecretString::from)
        .ok_or("--password or DESKLY_OPERATOR_PASSWORD is required")?;

    let config = ClientConfig::from_env()?;
    let mut session = BackofficeSession::new(HttpBackoffice::new(&config)?);
    session.login(&email, &password).await?;

    let result = perform(&mut session, action).await;

    if let Err(e) = session.logout().await {
        warn!(error = %e, "Logout failed");
    }
    Ok(result?)
}

#[allow(clippy::print_stdout)]
async fn perform(
    session: &mut BackofficeSession<HttpBackoffice>,
    action: OrdersAction,
) -> Result<(), ApiError> {
    let mut orders = session.orders()?;

    match action {
        OrdersAction::List { page, size } => {
            let page = orders.list_paged(PageRequest::new(page, size)).await?;
            println!(
                "Page {} of {} ({} orders)",
                page.number + 1,
                page.total_pages.max(1),
                page.total_elements
            );
            for order in &page.content {
                println!(
                    "  #{:<8} {:<22} {:>14}  {}",
                    order.id,
                    order.status,
                    order.total_value.to_brl(),
                    order.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        OrdersAction::Show { id } => {
            print_order(&orders.get(OrderId::new(id)).await?);
        }
        OrdersAction::SetStatus { id, status } => {
            let order = orders.update_status(OrderId::new(id), status).await?;
            print_order(&order);
        }
        OrdersAction::Reapprove { id } => {
            let order = orders.reapprove(OrderId::new(id)).await?;
            print_order(&order);
        }
        OrdersAction::History { id } => {
            let changes = orders.history(OrderId::new(id)).await?;
            if changes.is_empty() {
                println!("No status changes recorded");
            }
            for change in changes {
                println!(
                    "{}  {} -> {}  by {}",
                    change.changed_at.format("%Y-%m-%d %H:%M"),
                    change.from_status,
                    change.to_status,
                    change.changed_by.as_deref().unwrap_or("(deleted operator)")
                );
            }
        }
    }
    Ok(())
}
