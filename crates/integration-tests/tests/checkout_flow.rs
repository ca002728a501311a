//! Checkout orchestration against an in-memory storefront.
//!
//! Each test drives a real `CustomerSession` and `CheckoutOrchestrator`;
//! only the network is replaced.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::time::Duration;

use deskly_client::{CustomerSession, StorefrontApi};
use deskly_core::checkout::{CheckoutError, Step};
use deskly_core::{
    AddressDraft, AddressId, ErrorClass, Money, NewOrder, NewOrderItem, OrderStatus,
    PaymentMethod, PaymentSelection, ProductId, ShippingOption,
};
use uuid::Uuid;
use deskly_integration_tests::{FakeStorefront, Op, draft, http_error, password};

const TIMEOUT: Duration = Duration::from_secs(5);

struct Shop {
    api: FakeStorefront,
    desk: ProductId,
    lamp: ProductId,
    home: AddressId,
}

/// A customer with one default delivery address and two products.
fn shop() -> Shop {
    let api = FakeStorefront::new();
    let customer = api.add_customer("ana@example.com", "Ana Souza");
    let desk = api.add_product("Mesa de escritório", 89_990);
    let lamp = api.add_product("Luminária de mesa", 15_990);
    let home = api
        .add_address(
            customer,
            AddressDraft {
                is_delivery_default: true,
                ..draft("Casa")
            },
        )
        .id;
    Shop {
        api,
        desk,
        lamp,
        home,
    }
}

async fn logged_in(api: &FakeStorefront) -> CustomerSession<FakeStorefront> {
    let mut session = CustomerSession::new(api.clone());
    session.login("ana@example.com", &password()).await.unwrap();
    session
}

fn visa() -> PaymentSelection {
    PaymentSelection::card("Ana Souza", "4111 1111 1111 1111", "12", "2030", "123")
}

// =============================================================================
// Happy Paths
// =============================================================================

#[tokio::test]
async fn test_boleto_checkout_places_order_and_clears_cart() {
    let shop = shop();
    let mut session = logged_in(&shop.api).await;
    session.add_to_cart(shop.desk, 1).await.unwrap();
    session.add_to_cart(shop.lamp, 2).await.unwrap();

    let mut checkout = session.checkout(TIMEOUT);
    checkout.begin().await.unwrap();
    match checkout.step() {
        Step::Address(step) => {
            assert_eq!(step.addresses.len(), 1);
            assert_eq!(step.selected, Some(shop.home));
            assert!(!step.must_create_address);
        }
        other => panic!("expected ADDRESS, got {}", other.name()),
    }

    checkout.confirm_address().await.unwrap();
    checkout
        .choose_shipping(ShippingOption::Express)
        .await
        .unwrap();
    let order = checkout.submit(PaymentSelection::boleto()).await.unwrap();

    assert!(matches!(checkout.step(), Step::Confirmation(_)));
    assert!(checkout.cart().is_empty());
    drop(checkout);

    assert_eq!(order.status, OrderStatus::AwaitingPayment);
    assert_eq!(order.payment_method, PaymentMethod::Boleto);
    assert_eq!(order.card_last_four_digits, None);
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.shipping_value, Money::from_cents(3_000));
    // 899.90 + 2 x 159.90 + 30.00
    assert_eq!(order.total_value, Money::from_cents(124_970));
    assert!(order.totals_consistent());
    assert_eq!(order.address.label, "Casa");

    assert!(session.cart().is_empty());
    assert_eq!(session.my_orders().await.unwrap(), vec![order]);
}

#[tokio::test]
async fn test_card_checkout_keeps_only_holder_and_last_four() {
    let shop = shop();
    let mut session = logged_in(&shop.api).await;
    session.add_to_cart(shop.desk, 1).await.unwrap();

    let mut checkout = session.checkout(TIMEOUT);
    checkout.begin().await.unwrap();
    checkout.confirm_address().await.unwrap();
    let order = checkout.submit(visa()).await.unwrap();

    assert_eq!(order.payment_method, PaymentMethod::Card);
    assert_eq!(order.card_holder_name.as_deref(), Some("Ana Souza"));
    assert_eq!(order.card_last_four_digits.as_deref(), Some("1111"));
    assert_eq!(order.shipping_value, ShippingOption::Standard.value());
}

#[tokio::test]
async fn test_first_address_created_during_checkout() {
    let api = FakeStorefront::new();
    let _ = api.add_customer("ana@example.com", "Ana Souza");
    let desk = api.add_product("Mesa de escritório", 89_990);
    let mut session = logged_in(&api).await;
    session.add_to_cart(desk, 1).await.unwrap();

    let mut checkout = session.checkout(TIMEOUT);
    checkout.begin().await.unwrap();
    match checkout.step() {
        Step::Address(step) => assert!(step.must_create_address),
        other => panic!("expected ADDRESS, got {}", other.name()),
    }
    assert!(matches!(
        checkout.confirm_address().await,
        Err(CheckoutError::NoAddressSelected)
    ));

    checkout.create_address(draft("Trabalho")).await.unwrap();
    let Step::Payment(step) = checkout.step() else {
        panic!("expected PAYMENT, got {}", checkout.step().name());
    };
    assert_eq!(step.address.label, "Trabalho");
    assert_eq!(step.address.zip_code, "50050000");

    let order = checkout.submit(PaymentSelection::boleto()).await.unwrap();
    assert_eq!(order.address.label, "Trabalho");
}

#[tokio::test]
async fn test_back_returns_to_address_with_selection() {
    let shop = shop();
    let mut session = logged_in(&shop.api).await;
    session.add_to_cart(shop.desk, 1).await.unwrap();

    let mut checkout = session.checkout(TIMEOUT);
    checkout.begin().await.unwrap();
    checkout.confirm_address().await.unwrap();
    checkout.back().await.unwrap();

    let Step::Address(step) = checkout.step() else {
        panic!("expected ADDRESS, got {}", checkout.step().name());
    };
    assert_eq!(step.selected, Some(shop.home));
    assert_eq!(shop.api.calls(Op::ListAddresses), 1);
}

// =============================================================================
// Guards
// =============================================================================

#[tokio::test]
async fn test_empty_cart_refused_without_request() {
    let shop = shop();
    let mut session = logged_in(&shop.api).await;

    let mut checkout = session.checkout(TIMEOUT);
    assert!(matches!(checkout.begin().await, Err(CheckoutError::EmptyCart)));
    assert_eq!(checkout.step(), &Step::Cart);
    assert_eq!(shop.api.calls(Op::ListAddresses), 0);
}

#[tokio::test]
async fn test_begin_requires_login() {
    let shop = shop();
    let mut session = CustomerSession::new(shop.api.clone());
    session.add_to_cart(shop.desk, 1).await.unwrap();

    let mut checkout = session.checkout(TIMEOUT);
    let err = checkout.begin().await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Auth);
    assert_eq!(checkout.step(), &Step::Cart);
    assert_eq!(shop.api.calls(Op::ListAddresses), 0);
}

#[tokio::test]
async fn test_invalid_card_rejected_before_submission() {
    let shop = shop();
    let mut session = logged_in(&shop.api).await;
    session.add_to_cart(shop.desk, 1).await.unwrap();

    let mut checkout = session.checkout(TIMEOUT);
    checkout.begin().await.unwrap();
    checkout.confirm_address().await.unwrap();

    let bad = PaymentSelection::card("Ana Souza", "4111", "12", "2030", "123");
    let err = checkout.submit(bad).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Payment(_)));
    assert_eq!(err.class(), ErrorClass::Validation);
    assert!(matches!(checkout.step(), Step::Payment(_)));
    assert_eq!(shop.api.calls(Op::SubmitOrder), 0);
}

#[tokio::test]
async fn test_unknown_address_cannot_be_selected() {
    let shop = shop();
    let mut session = logged_in(&shop.api).await;
    session.add_to_cart(shop.desk, 1).await.unwrap();

    let mut checkout = session.checkout(TIMEOUT);
    checkout.begin().await.unwrap();
    let err = checkout
        .select_address(AddressId::new(9_999))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::UnknownAddress(_)));
}

#[tokio::test]
async fn test_emptying_cart_aborts_checkout() {
    let shop = shop();
    let mut session = logged_in(&shop.api).await;
    session.add_to_cart(shop.desk, 1).await.unwrap();

    let mut checkout = session.checkout(TIMEOUT);
    checkout.begin().await.unwrap();
    checkout.confirm_address().await.unwrap();
    checkout
        .modify_cart(|cart| {
            cart.clear();
            Ok(())
        })
        .unwrap();

    assert_eq!(checkout.step(), &Step::Aborted);
    assert!(checkout.submit(PaymentSelection::boleto()).await.is_err());
    assert_eq!(shop.api.calls(Op::SubmitOrder), 0);
}

#[tokio::test]
async fn test_cart_change_during_checkout_is_submitted() {
    let shop = shop();
    let mut session = logged_in(&shop.api).await;
    session.add_to_cart(shop.desk, 1).await.unwrap();

    let mut checkout = session.checkout(TIMEOUT);
    checkout.begin().await.unwrap();
    checkout.confirm_address().await.unwrap();
    checkout
        .modify_cart(|cart| cart.set_quantity(shop.desk, 3))
        .unwrap();
    let order = checkout.submit(PaymentSelection::boleto()).await.unwrap();

    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].quantity, 3);
}

// =============================================================================
// Failures and Retries
// =============================================================================

#[tokio::test]
async fn test_server_error_keeps_cart_and_allows_retry() {
    let shop = shop();
    let mut session = logged_in(&shop.api).await;
    session.add_to_cart(shop.desk, 1).await.unwrap();
    shop.api
        .fail_next(Op::SubmitOrder, http_error(503, "database unavailable"));

    let mut checkout = session.checkout(TIMEOUT);
    checkout.begin().await.unwrap();
    checkout.confirm_address().await.unwrap();

    let err = checkout
        .submit(PaymentSelection::boleto())
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Server);
    let Step::Payment(step) = checkout.step() else {
        panic!("expected PAYMENT, got {}", checkout.step().name());
    };
    assert!(step.last_error.is_some());
    assert_eq!(checkout.cart().len(), 1);

    let order = checkout.submit(PaymentSelection::boleto()).await.unwrap();
    assert_eq!(shop.api.orders(), vec![order]);
}

#[tokio::test]
async fn test_timed_out_submission_is_not_duplicated_on_retry() {
    let shop = shop();
    let mut session = logged_in(&shop.api).await;
    session.add_to_cart(shop.desk, 1).await.unwrap();
    shop.api
        .set_submit_delay(Some(Duration::from_millis(300)));

    let mut checkout = session.checkout(Duration::from_millis(30));
    checkout.begin().await.unwrap();
    checkout.confirm_address().await.unwrap();

    let err = checkout
        .submit(PaymentSelection::boleto())
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Network);
    assert!(matches!(checkout.step(), Step::Payment(_)));
    // The server committed even though the client gave up
    assert_eq!(shop.api.orders().len(), 1);

    shop.api.set_submit_delay(None);
    let order = checkout.submit(PaymentSelection::boleto()).await.unwrap();

    assert_eq!(shop.api.calls(Op::SubmitOrder), 2);
    assert_eq!(shop.api.orders(), vec![order]);
}

#[tokio::test]
async fn test_cart_edited_after_timeout_places_the_edited_order() {
    let shop = shop();
    let mut session = logged_in(&shop.api).await;
    session.add_to_cart(shop.desk, 1).await.unwrap();
    shop.api
        .set_submit_delay(Some(Duration::from_millis(300)));

    let mut checkout = session.checkout(Duration::from_millis(30));
    checkout.begin().await.unwrap();
    checkout.confirm_address().await.unwrap();
    let err = checkout
        .submit(PaymentSelection::boleto())
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Network);

    shop.api.set_submit_delay(None);
    checkout
        .modify_cart(|cart| cart.set_quantity(shop.desk, 5))
        .unwrap();
    let order = checkout.submit(PaymentSelection::boleto()).await.unwrap();

    assert_eq!(order.items[0].quantity, 5);
    assert!(checkout.cart().is_empty());
    // The timed-out order for one desk was committed too; it is a separate order.
    let placed = shop.api.orders();
    assert_eq!(placed.len(), 2);
    assert_eq!(placed[0].items[0].quantity, 1);
    assert_eq!(placed[1], order);
}

#[tokio::test]
async fn test_shipping_changed_after_timeout_places_new_order() {
    let shop = shop();
    let mut session = logged_in(&shop.api).await;
    session.add_to_cart(shop.lamp, 1).await.unwrap();
    shop.api
        .set_submit_delay(Some(Duration::from_millis(300)));

    let mut checkout = session.checkout(Duration::from_millis(30));
    checkout.begin().await.unwrap();
    checkout.confirm_address().await.unwrap();
    assert!(checkout.submit(PaymentSelection::boleto()).await.is_err());

    shop.api.set_submit_delay(None);
    checkout
        .choose_shipping(ShippingOption::Express)
        .await
        .unwrap();
    let order = checkout.submit(PaymentSelection::boleto()).await.unwrap();

    assert_eq!(order.shipping_value, ShippingOption::Express.value());
    assert_eq!(shop.api.orders().len(), 2);
}

#[tokio::test]
async fn test_session_expiry_on_submit_returns_to_cart() {
    let shop = shop();
    let mut session = logged_in(&shop.api).await;
    session.add_to_cart(shop.desk, 2).await.unwrap();

    let mut checkout = session.checkout(TIMEOUT);
    checkout.begin().await.unwrap();
    checkout.confirm_address().await.unwrap();
    shop.api.expire_session();

    let err = checkout
        .submit(PaymentSelection::boleto())
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Auth);
    assert_eq!(checkout.step(), &Step::Cart);
    drop(checkout);

    assert!(!session.is_logged_in());
    assert_eq!(session.cart().item_count(), 2);
    assert!(shop.api.orders().is_empty());
}

#[tokio::test]
async fn test_address_load_failure_can_be_retried() {
    let shop = shop();
    let mut session = logged_in(&shop.api).await;
    session.add_to_cart(shop.desk, 1).await.unwrap();
    shop.api
        .fail_next(Op::ListAddresses, http_error(500, "boom"));

    let mut checkout = session.checkout(TIMEOUT);
    let err = checkout.begin().await.unwrap_err();
    assert!(err.class().is_retryable());
    let Step::Address(step) = checkout.step() else {
        panic!("expected ADDRESS, got {}", checkout.step().name());
    };
    assert!(step.last_error.is_some());

    checkout.reload_addresses().await.unwrap();
    checkout.confirm_address().await.unwrap();
    assert!(matches!(checkout.step(), Step::Payment(_)));
}

#[tokio::test]
async fn test_address_creation_failure_keeps_draft() {
    let api = FakeStorefront::new();
    let _ = api.add_customer("ana@example.com", "Ana Souza");
    let desk = api.add_product("Mesa de escritório", 89_990);
    let mut session = logged_in(&api).await;
    session.add_to_cart(desk, 1).await.unwrap();
    api.fail_next(Op::CreateAddress, http_error(409, "concurrent default change"));

    let mut checkout = session.checkout(TIMEOUT);
    checkout.begin().await.unwrap();
    let err = checkout.create_address(draft("Casa")).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Conflict);

    let Step::Address(step) = checkout.step() else {
        panic!("expected ADDRESS, got {}", checkout.step().name());
    };
    assert!(!step.creating);
    assert_eq!(
        step.pending_draft.as_ref().map(|d| d.label.as_str()),
        Some("Casa")
    );
}

// =============================================================================
// Server-Side Pricing
// =============================================================================

#[tokio::test]
async fn test_reused_key_with_different_items_is_conflict() {
    let shop = shop();
    let _session = logged_in(&shop.api).await;
    let request = |quantity| NewOrder {
        idempotency_key: Uuid::from_u128(1),
        address_id: shop.home,
        shipping_value: ShippingOption::Standard.value(),
        items: vec![NewOrderItem {
            product_id: shop.desk,
            quantity,
        }],
        payment: PaymentSelection::boleto(),
    };

    let first = shop.api.submit_order(&request(1)).await.unwrap();
    assert_eq!(shop.api.submit_order(&request(1)).await.unwrap(), first);

    let err = shop.api.submit_order(&request(4)).await.unwrap_err();
    assert_eq!(err.class, ErrorClass::Conflict);
    assert_eq!(shop.api.orders(), vec![first]);
}

#[tokio::test]
async fn test_catalog_price_wins_over_cart_snapshot() {
    let shop = shop();
    let mut session = logged_in(&shop.api).await;
    session.add_to_cart(shop.lamp, 1).await.unwrap();
    shop.api.set_price(shop.lamp, 12_990);

    let mut checkout = session.checkout(TIMEOUT);
    checkout.begin().await.unwrap();
    checkout.confirm_address().await.unwrap();
    let order = checkout.submit(PaymentSelection::boleto()).await.unwrap();

    assert_eq!(order.items[0].unit_price, Money::from_cents(12_990));
    assert_eq!(order.total_value, Money::from_cents(14_490));
}

#[tokio::test]
async fn test_product_deactivated_before_submission() {
    let shop = shop();
    let mut session = logged_in(&shop.api).await;
    session.add_to_cart(shop.desk, 1).await.unwrap();
    shop.api.deactivate(shop.desk);

    let mut checkout = session.checkout(TIMEOUT);
    checkout.begin().await.unwrap();
    checkout.confirm_address().await.unwrap();
    let err = checkout
        .submit(PaymentSelection::boleto())
        .await
        .unwrap_err();

    assert_eq!(err.class(), ErrorClass::NotFound);
    assert!(matches!(checkout.step(), Step::Payment(_)));
}

#[tokio::test]
async fn test_order_keeps_address_after_deletion() {
    let shop = shop();
    let mut session = logged_in(&shop.api).await;
    session.add_to_cart(shop.desk, 1).await.unwrap();

    let order = {
        let mut checkout = session.checkout(TIMEOUT);
        checkout.begin().await.unwrap();
        checkout.confirm_address().await.unwrap();
        checkout.submit(PaymentSelection::boleto()).await.unwrap()
    };
    shop.api.delete_address(shop.home);

    let fetched = session.order(order.id).await.unwrap();
    assert_eq!(fetched.address, order.address);
}
