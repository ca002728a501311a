//! Backoffice status changes under both transition policies.
//!
//! Orders are placed through a real checkout against the in-memory
//! storefront, then handed to the in-memory backoffice.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::time::Duration;

use deskly_client::{BackofficeSession, CustomerSession};
use deskly_core::{
    AddressDraft, BackofficeRole, ErrorClass, Order, OrderId, OrderStatus, PageRequest,
    PaymentSelection, TransitionPolicy,
};
use deskly_integration_tests::{FakeBackoffice, FakeStorefront, draft, password};
use secrecy::SecretString;

const OPERATOR: &str = "ops@deskly.com.br";
const VIEWER: &str = "auditoria@deskly.com.br";

/// Place `count` boleto orders for one customer, oldest first.
async fn placed_orders(count: usize) -> Vec<Order> {
    let api = FakeStorefront::new();
    let customer = api.add_customer("ana@example.com", "Ana Souza");
    let desk = api.add_product("Mesa de escritório", 89_990);
    let _ = api.add_address(
        customer,
        AddressDraft {
            is_delivery_default: true,
            ..draft("Casa")
        },
    );

    let mut session = CustomerSession::new(api);
    session.login("ana@example.com", &password()).await.unwrap();

    let mut orders = Vec::with_capacity(count);
    for _ in 0..count {
        session.add_to_cart(desk, 1).await.unwrap();
        let mut checkout = session.checkout(Duration::from_secs(5));
        checkout.begin().await.unwrap();
        checkout.confirm_address().await.unwrap();
        orders.push(checkout.submit(PaymentSelection::boleto()).await.unwrap());
    }
    orders
}

/// A backoffice holding `orders`, with one operator and one viewer.
fn backoffice(policy: TransitionPolicy, orders: &[Order]) -> FakeBackoffice {
    let fake = FakeBackoffice::new(policy);
    let _ = fake.add_operator(OPERATOR, "Operação", BackofficeRole::Operator);
    let _ = fake.add_operator(VIEWER, "Auditoria", BackofficeRole::Viewer);
    for order in orders {
        fake.add_order(order.clone());
    }
    fake
}

async fn operator(fake: &FakeBackoffice, email: &str) -> BackofficeSession<FakeBackoffice> {
    let mut session = BackofficeSession::new(fake.clone());
    session.login(email, &password()).await.unwrap();
    session
}

/// One placed order, a backoffice with `policy` and a logged-in operator.
async fn setup(
    policy: TransitionPolicy,
) -> (OrderId, FakeBackoffice, BackofficeSession<FakeBackoffice>) {
    let orders = placed_orders(1).await;
    let fake = backoffice(policy, &orders);
    let session = operator(&fake, OPERATOR).await;
    (orders[0].id, fake, session)
}

// =============================================================================
// Permissive Policy
// =============================================================================

#[tokio::test]
async fn test_permissive_allows_any_jump_and_records_history() {
    let (id, fake, mut session) = setup(TransitionPolicy::Permissive).await;
    let mut orders = session.orders().unwrap();

    let order = orders.update_status(id, OrderStatus::Delivered).await.unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);
    assert_eq!(order.items.len(), 1);

    // Manual correction back to the start.
    let order = orders
        .update_status(id, OrderStatus::AwaitingPayment)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::AwaitingPayment);

    let history = orders.history(id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].from_status, OrderStatus::AwaitingPayment);
    assert_eq!(history[0].to_status, OrderStatus::Delivered);
    assert_eq!(history[1].to_status, OrderStatus::AwaitingPayment);
    assert!(
        history
            .iter()
            .all(|change| change.changed_by.as_deref() == Some(OPERATOR))
    );
    assert_eq!(fake.history_len(), 2);
}

#[tokio::test]
async fn test_setting_same_status_records_nothing() {
    let (id, fake, mut session) = setup(TransitionPolicy::Permissive).await;
    let mut orders = session.orders().unwrap();

    let order = orders
        .update_status(id, OrderStatus::AwaitingPayment)
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::AwaitingPayment);
    assert_eq!(fake.history_len(), 0);
    assert!(orders.history(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reapprove_requires_rejected_order_even_when_permissive() {
    let (id, fake, mut session) = setup(TransitionPolicy::Permissive).await;
    let mut orders = session.orders().unwrap();

    let err = orders.reapprove(id).await.unwrap_err();
    assert_eq!(err.class, ErrorClass::Conflict);
    assert_eq!(fake.order(id).unwrap().status, OrderStatus::AwaitingPayment);

    orders
        .update_status(id, OrderStatus::PaymentRejected)
        .await
        .unwrap();
    let order = orders.reapprove(id).await.unwrap();
    assert_eq!(order.status, OrderStatus::PaymentApproved);
}

// =============================================================================
// Strict Policy
// =============================================================================

#[tokio::test]
async fn test_strict_refuses_moving_backwards() {
    let (id, fake, mut session) = setup(TransitionPolicy::Strict).await;
    let mut orders = session.orders().unwrap();

    orders
        .update_status(id, OrderStatus::PaymentApproved)
        .await
        .unwrap();
    let err = orders
        .update_status(id, OrderStatus::AwaitingPayment)
        .await
        .unwrap_err();

    assert_eq!(err.class, ErrorClass::Conflict);
    assert_eq!(err.status, Some(409));
    assert_eq!(fake.order(id).unwrap().status, OrderStatus::PaymentApproved);
    assert_eq!(fake.history_len(), 1);
}

#[tokio::test]
async fn test_strict_allows_skipping_forward_but_delivered_is_final() {
    let (id, fake, mut session) = setup(TransitionPolicy::Strict).await;
    let mut orders = session.orders().unwrap();

    orders.update_status(id, OrderStatus::InTransit).await.unwrap();
    orders.update_status(id, OrderStatus::Delivered).await.unwrap();

    for next in [OrderStatus::InTransit, OrderStatus::PaymentRejected] {
        let err = orders.update_status(id, next).await.unwrap_err();
        assert_eq!(err.class, ErrorClass::Conflict, "{next}");
    }
    assert_eq!(fake.order(id).unwrap().status, OrderStatus::Delivered);
}

#[tokio::test]
async fn test_strict_same_status_on_final_states_changes_nothing() {
    let orders_placed = placed_orders(2).await;
    let fake = backoffice(TransitionPolicy::Strict, &orders_placed);
    let mut session = operator(&fake, OPERATOR).await;
    let mut orders = session.orders().unwrap();
    let (delivered, rejected) = (orders_placed[0].id, orders_placed[1].id);

    orders
        .update_status(delivered, OrderStatus::Delivered)
        .await
        .unwrap();
    orders
        .update_status(rejected, OrderStatus::PaymentRejected)
        .await
        .unwrap();
    assert_eq!(fake.history_len(), 2);

    let order = orders
        .update_status(delivered, OrderStatus::Delivered)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);
    let order = orders
        .update_status(rejected, OrderStatus::PaymentRejected)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::PaymentRejected);
    assert_eq!(fake.history_len(), 2);
}

#[tokio::test]
async fn test_strict_rejection_only_from_awaiting_payment() {
    let orders_placed = placed_orders(2).await;
    let fake = backoffice(TransitionPolicy::Strict, &orders_placed);
    let mut session = operator(&fake, OPERATOR).await;
    let mut orders = session.orders().unwrap();
    let (pending, approved) = (orders_placed[0].id, orders_placed[1].id);

    orders
        .update_status(approved, OrderStatus::PaymentApproved)
        .await
        .unwrap();
    let err = orders
        .update_status(approved, OrderStatus::PaymentRejected)
        .await
        .unwrap_err();
    assert_eq!(err.class, ErrorClass::Conflict);

    let order = orders
        .update_status(pending, OrderStatus::PaymentRejected)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::PaymentRejected);
}

#[tokio::test]
async fn test_strict_rejected_order_leaves_only_through_reapproval() {
    let (id, fake, mut session) = setup(TransitionPolicy::Strict).await;
    let mut orders = session.orders().unwrap();

    orders
        .update_status(id, OrderStatus::PaymentRejected)
        .await
        .unwrap();
    let err = orders
        .update_status(id, OrderStatus::PaymentApproved)
        .await
        .unwrap_err();
    assert_eq!(err.class, ErrorClass::Conflict);

    let order = orders.reapprove(id).await.unwrap();
    assert_eq!(order.status, OrderStatus::PaymentApproved);

    let history = orders.history(id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].from_status, OrderStatus::PaymentRejected);
    assert_eq!(history[1].to_status, OrderStatus::PaymentApproved);

    // Approved orders continue through the pipeline as usual.
    orders
        .update_status(id, OrderStatus::AwaitingPickup)
        .await
        .unwrap();
    assert_eq!(fake.history_len(), 3);
}

// =============================================================================
// Roles and Session
// =============================================================================

#[tokio::test]
async fn test_viewer_can_read_but_not_change_orders() {
    let placed = placed_orders(1).await;
    let fake = backoffice(TransitionPolicy::Permissive, &placed);
    let mut session = operator(&fake, VIEWER).await;
    assert_eq!(session.user().unwrap().role, BackofficeRole::Viewer);
    let mut orders = session.orders().unwrap();
    let id = placed[0].id;

    assert_eq!(orders.get(id).await.unwrap(), placed[0]);

    let err = orders
        .update_status(id, OrderStatus::PaymentApproved)
        .await
        .unwrap_err();
    assert_eq!(err.class, ErrorClass::Forbidden);
    let err = orders.reapprove(id).await.unwrap_err();
    assert_eq!(err.class, ErrorClass::Forbidden);

    assert_eq!(fake.order(id).unwrap().status, OrderStatus::AwaitingPayment);
    // Forbidden keeps the session.
    assert!(session.user().is_some());
}

#[tokio::test]
async fn test_orders_require_login() {
    let fake = backoffice(TransitionPolicy::Permissive, &[]);
    let mut session = BackofficeSession::new(fake.clone());

    let err = session.orders().err().unwrap();
    assert_eq!(err.class, ErrorClass::Auth);

    let err = session
        .login(OPERATOR, &SecretString::from("not the password"))
        .await
        .unwrap_err();
    assert_eq!(err.class, ErrorClass::Auth);
    assert!(session.user().is_none());
}

#[tokio::test]
async fn test_expired_session_logs_operator_out() {
    let (id, fake, mut session) = setup(TransitionPolicy::Permissive).await;
    fake.expire_session();

    let err = session
        .orders()
        .unwrap()
        .update_status(id, OrderStatus::PaymentApproved)
        .await
        .unwrap_err();

    assert_eq!(err.class, ErrorClass::Auth);
    assert!(session.user().is_none());
    assert!(session.orders().is_err());
    assert_eq!(fake.order(id).unwrap().status, OrderStatus::AwaitingPayment);
}

#[tokio::test]
async fn test_logout_ends_the_session() {
    let (_, _fake, mut session) = setup(TransitionPolicy::Permissive).await;

    session.logout().await.unwrap();

    assert!(session.user().is_none());
    assert!(session.orders().is_err());
}

// =============================================================================
// Listing
// =============================================================================

#[tokio::test]
async fn test_list_paged_newest_first_with_metadata() {
    let placed = placed_orders(5).await;
    let fake = backoffice(TransitionPolicy::Permissive, &placed);
    let mut session = operator(&fake, OPERATOR).await;
    let mut orders = session.orders().unwrap();

    let first = orders.list_paged(PageRequest::new(0, 2)).await.unwrap();
    assert_eq!(first.total_elements, 5);
    assert_eq!(first.total_pages, 3);
    assert_eq!(first.size, 2);
    assert!(first.first);
    assert!(!first.last);
    let ids: Vec<OrderId> = first.content.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![placed[4].id, placed[3].id]);

    let last = orders.list_paged(PageRequest::new(2, 2)).await.unwrap();
    assert_eq!(last.number, 2);
    assert!(last.last);
    assert_eq!(last.content.len(), 1);
    assert_eq!(last.content[0].id, placed[0].id);

    let beyond = orders.list_paged(PageRequest::new(7, 2)).await.unwrap();
    assert!(beyond.empty);
    assert_eq!(beyond.total_elements, 5);
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let (_, _fake, mut session) = setup(TransitionPolicy::Permissive).await;
    let mut orders = session.orders().unwrap();
    let missing = OrderId::new(9_999);

    assert_eq!(
        orders.get(missing).await.unwrap_err().class,
        ErrorClass::NotFound
    );
    assert_eq!(
        orders
            .update_status(missing, OrderStatus::Delivered)
            .await
            .unwrap_err()
            .class,
        ErrorClass::NotFound
    );
    assert_eq!(
        orders.history(missing).await.unwrap_err().class,
        ErrorClass::NotFound
    );
}
