//! Deskly CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run all database migrations (storefront first, admin depends on it)
//! deskly-cli migrate all
//!
//! # Create a backoffice operator
//! ADMIN_OPERATOR_PASSWORD=... deskly-cli admin create -e ops@example.com -n "Ops" -r operator
//!
//! # Seed the catalog and a demo customer
//! deskly-cli seed --customer-email ana@example.com
//!
//! # Place an order through the storefront API
//! deskly-cli checkout -e ana@example.com --item 1:2 --item 3:1 --shipping express
//!
//! # Move an order along its lifecycle through the backoffice API
//! deskly-cli orders set-status 42 EM_TRANSITO
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations (schemas and session tables)
//! - `admin create` - Create backoffice operators
//! - `seed` - Insert a demo catalog and customer
//! - `checkout` - Drive a full checkout as a customer
//! - `orders` - List, inspect and update orders as an operator

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use deskly_core::BackofficeRole;
use secrecy::SecretString;

mod commands;

use commands::checkout::CheckoutArgs;
use commands::orders::{OperatorLogin, OrdersAction};

#[derive(Parser)]
#[command(name = "deskly-cli")]
#[command(author, version, about = "Deskly CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
    /// Manage backoffice operators
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Seed the database with a demo catalog
    Seed {
        /// Also register a demo customer with this email
        #[arg(long)]
        customer_email: Option<String>,

        /// Demo customer display name
        #[arg(long, default_value = "Cliente Demo")]
        customer_name: String,

        /// Demo customer password
        #[arg(long, env = "DESKLY_SEED_CUSTOMER_PASSWORD", hide_env_values = true)]
        customer_password: Option<String>,
    },
    /// Place an order through the storefront API
    Checkout(CheckoutArgs),
    /// Manage orders through the backoffice API
    Orders {
        #[command(flatten)]
        login: OperatorLogin,

        #[command(subcommand)]
        action: OrdersAction,
    },
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Run storefront database migrations
    Storefront,
    /// Run admin database migrations
    Admin,
    /// Run all database migrations
    All,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new backoffice operator
    Create {
        /// Operator email address
        #[arg(short, long)]
        email: String,

        /// Operator display name
        #[arg(short, long)]
        name: String,

        /// Operator role (`admin`, `operator`, `viewer`)
        #[arg(short, long, default_value = "operator")]
        role: BackofficeRole,

        /// Initial password (at least 12 characters)
        #[arg(long, env = "ADMIN_OPERATOR_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() {
    // Progress goes to stderr so command output can be piped
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "deskly_cli=info,deskly_client=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate { target } => match target {
            MigrateTarget::Storefront => commands::migrate::storefront().await?,
            MigrateTarget::Admin => commands::migrate::admin().await?,
            MigrateTarget::All => {
                commands::migrate::storefront().await?;
                commands::migrate::admin().await?;
            }
        },
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                role,
                password,
            } => {
                commands::admin::create_user(&email, &name, role, &SecretString::from(password))
                    .await?;
            }
        },
        Commands::Seed {
            customer_email,
            customer_name,
            customer_password,
        } => {
            let customer = match (customer_email, customer_password) {
                (Some(email), Some(password)) => Some(commands::seed::SeedCustomer {
                    email,
                    name: customer_name,
                    password: SecretString::from(password),
                }),
                (Some(_), None) => {
                    return Err("--customer-email needs DESKLY_SEED_CUSTOMER_PASSWORD".into());
                }
                (None, _) => None,
            };
            commands::seed::run(customer).await?;
        }
        Commands::Checkout(args) => commands::checkout::run(args).await?,
        Commands::Orders { login, action } => commands::orders::run(login, action).await?,
    }
    Ok(())
}
