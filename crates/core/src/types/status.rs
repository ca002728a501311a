//! Order status lifecycle, payment methods and backoffice roles.
//!
//! Status wire names are Portuguese because they are shared with the
//! database enum and every API consumer.

use serde::{Deserialize, Serialize};

/// Fulfillment status of an order.
///
/// ```text
/// AGUARDANDO_PAGAMENTO -> PAGAMENTO_APROVADO -> AGUARDANDO_RETIRADA -> EM_TRANSITO -> ENTREGUE
///          |
///          +-> PAGAMENTO_REJEITADO
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "storefront.order_status"))]
pub enum OrderStatus {
    #[default]
    #[serde(rename = "AGUARDANDO_PAGAMENTO")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "AGUARDANDO_PAGAMENTO"))]
    AwaitingPayment,
    #[serde(rename = "PAGAMENTO_APROVADO")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "PAGAMENTO_APROVADO"))]
    PaymentApproved,
    #[serde(rename = "PAGAMENTO_REJEITADO")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "PAGAMENTO_REJEITADO"))]
    PaymentRejected,
    #[serde(rename = "AGUARDANDO_RETIRADA")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "AGUARDANDO_RETIRADA"))]
    AwaitingPickup,
    #[serde(rename = "EM_TRANSITO")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "EM_TRANSITO"))]
    InTransit,
    #[serde(rename = "ENTREGUE")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "ENTREGUE"))]
    Delivered,
}

impl OrderStatus {
    pub const ALL: [Self; 6] = [
        Self::AwaitingPayment,
        Self::PaymentApproved,
        Self::PaymentRejected,
        Self::AwaitingPickup,
        Self::InTransit,
        Self::Delivered,
    ];

    /// Wire name, as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AwaitingPayment => "AGUARDANDO_PAGAMENTO",
            Self::PaymentApproved => "PAGAMENTO_APROVADO",
            Self::PaymentRejected => "PAGAMENTO_REJEITADO",
            Self::AwaitingPickup => "AGUARDANDO_RETIRADA",
            Self::InTransit => "EM_TRANSITO",
            Self::Delivered => "ENTREGUE",
        }
    }

    /// Human-readable label shown to customers and operators.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::AwaitingPayment => "Aguardando pagamento",
            Self::PaymentApproved => "Pagamento aprovado",
            Self::PaymentRejected => "Pagamento rejeitado",
            Self::AwaitingPickup => "Aguardando retirada",
            Self::InTransit => "Em trânsito",
            Self::Delivered => "Entregue",
        }
    }

    /// Position along the fulfillment pipeline. The rejected branch has none.
    const fn pipeline_rank(self) -> Option<u8> {
        match self {
            Self::AwaitingPayment => Some(0),
            Self::PaymentApproved => Some(1),
            Self::AwaitingPickup => Some(2),
            Self::InTransit => Some(3),
            Self::Delivered => Some(4),
            Self::PaymentRejected => None,
        }
    }

    /// Whether the status ends the lifecycle under [`TransitionPolicy::Strict`].
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::PaymentRejected)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

/// Why a status change was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("order is {from} which is terminal")]
    Terminal { from: OrderStatus },
    #[error("{to} can only follow AGUARDANDO_PAGAMENTO, order is {from}")]
    RejectionNotAllowed { from: OrderStatus, to: OrderStatus },
    #[error("cannot move order back from {from} to {to}")]
    Backwards { from: OrderStatus, to: OrderStatus },
    #[error("re-approval requires a PAGAMENTO_REJEITADO order, order is {from}")]
    NotRejected { from: OrderStatus },
}

/// Rule set applied by the backoffice when an operator changes a status.
///
/// `Permissive` lets an authorized operator set any status from any other,
/// which is how manual corrections are done. `Strict` turns the lifecycle
/// into a guarded state machine; leaving the rejected branch then requires
/// [`TransitionPolicy::check_reapproval`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    #[default]
    Permissive,
    Strict,
}

impl TransitionPolicy {
    /// Check a regular `updateStatus` request.
    ///
    /// Setting the current status is always accepted; it changes nothing,
    /// terminal states included.
    ///
    /// # Errors
    ///
    /// Returns a [`TransitionError`] when the strict policy refuses the move.
    pub fn check(self, from: OrderStatus, to: OrderStatus) -> Result<(), TransitionError> {
        if from == to || matches!(self, Self::Permissive) {
            return Ok(());
        }
        if from.is_terminal() {
            return Err(TransitionError::Terminal { from });
        }
        match (from.pipeline_rank(), to.pipeline_rank()) {
            (Some(_), None) => {
                if matches!(from, OrderStatus::AwaitingPayment) {
                    Ok(())
                } else {
                    Err(TransitionError::RejectionNotAllowed { from, to })
                }
            }
            (Some(current), Some(next)) if next < current => {
                Err(TransitionError::Backwards { from, to })
            }
            _ => Ok(()),
        }
    }

    /// Check the explicit re-approval action, which is valid under both
    /// policies and only for rejected orders.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::NotRejected`] for any other current status.
    pub const fn check_reapproval(from: OrderStatus) -> Result<(), TransitionError> {
        match from {
            OrderStatus::PaymentRejected => Ok(()),
            _ => Err(TransitionError::NotRejected { from }),
        }
    }
}

impl std::str::FromStr for TransitionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" | "false" | "0" | "" => Ok(Self::Permissive),
            "strict" | "true" | "1" => Ok(Self::Strict),
            other => Err(format!("invalid transition policy: {other}")),
        }
    }
}

/// How the customer pays for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.payment_method", rename_all = "UPPERCASE")
)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    Card,
    Boleto,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Card => f.write_str("CARD"),
            Self::Boleto => f.write_str("BOLETO"),
        }
    }
}

/// Backoffice operator role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "admin.backoffice_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum BackofficeRole {
    /// Everything, including operator management.
    Admin,
    /// Can change order statuses.
    Operator,
    /// Read-only access to orders.
    Viewer,
}

impl BackofficeRole {
    #[must_use]
    pub const fn can_update_orders(self) -> bool {
        matches!(self, Self::Admin | Self::Operator)
    }
}

impl std::fmt::Display for BackofficeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Operator => write!(f, "operator"),
            Self::Viewer => write!(f, "viewer"),
        }
    }
}

impl std::str::FromStr for BackofficeRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "operator" => Ok(Self::Operator),
            "viewer" => Ok(Self::Viewer),
            _ => Err(format!("invalid backoffice role: {s}")),
        }
    }
}
